use rayon::prelude::*;
use std::cmp::Ordering;

use crate::record::{DISPLAY_COLUMNS, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    /// Index into `DISPLAY_COLUMNS`
    pub column: usize,
    pub ascending: bool,
}

pub fn matches(record: &Record, needle_lower: &str) -> bool {
    record
        .values()
        .any(|v| v.to_lowercase().contains(needle_lower))
}

/// Dataset indices of all records where any value contains `query`, ignoring case.
/// The result keeps dataset order, an empty query selects everything.
pub fn filter_records(records: &[Record], query: &str) -> Vec<usize> {
    if query.is_empty() {
        return (0..records.len()).collect();
    }
    let needle = query.to_lowercase();
    records
        .par_iter()
        .enumerate()
        .filter(|(_, record)| matches(record, &needle))
        .map(|(idx, _)| idx)
        .collect()
}

/// Stable sort of `rows` (dataset indices) by a display column. Absent values go last in
/// both directions.
pub fn sort_rows(records: &[Record], rows: &mut [usize], order: SortOrder) {
    let Some(field) = DISPLAY_COLUMNS.get(order.column) else {
        return;
    };
    rows.sort_by(|&a, &b| {
        match (records[a].get(field), records[b].get(field)) {
            (Some(a), Some(b)) => {
                let ord = compare_values(a, b);
                if order.ascending { ord } else { ord.reverse() }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

// Numbers before text, numbers by value, text lexically.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;

    fn inventory() -> Vec<Record> {
        vec![
            record(&[
                ("URL", "https://alpha.example"),
                ("Account", "111"),
                ("Region", "eu-north-1"),
            ]),
            record(&[
                ("URL", "https://beta.example"),
                ("Account", "20"),
                ("Region", "us-east-1"),
            ]),
            record(&[
                ("URL", "https://gamma.example"),
                ("Account", "3"),
                ("Owner", "Team-Alpha"),
            ]),
            record(&[("Account", "abc")]),
        ]
    }

    #[test]
    fn empty_query_is_identity() {
        let records = inventory();
        assert_eq!(filter_records(&records, ""), vec![0, 1, 2, 3]);
    }

    #[test]
    fn matches_any_field_ignoring_case() {
        let records = inventory();
        // "Owner" is not a display column but still searched
        assert_eq!(filter_records(&records, "ALPHA"), vec![0, 2]);
        assert_eq!(filter_records(&records, "east"), vec![1]);
        assert_eq!(filter_records(&records, "nothing-here"), Vec::<usize>::new());
    }

    #[test]
    fn included_and_excluded_partition_the_dataset() {
        let records = inventory();
        for query in ["a", "1", "example", "EU", "-", "zzz"] {
            let hits = filter_records(&records, query);
            let needle = query.to_lowercase();
            for (idx, r) in records.iter().enumerate() {
                let contains = r.values().any(|v| v.to_lowercase().contains(&needle));
                assert_eq!(hits.contains(&idx), contains, "query {query:?} record {idx}");
            }
        }
    }

    #[test]
    fn absent_values_never_match() {
        let records = vec![
            Record::from_iter([("URL", None), ("Region", Some("x".to_string()))]),
        ];
        assert!(filter_records(&records, "null").is_empty());
        assert!(filter_records(&records, "undefined").is_empty());
    }

    #[test]
    fn sorts_numbers_by_value() {
        let records = inventory();
        let mut rows = vec![0, 1, 2, 3];
        sort_rows(&records, &mut rows, SortOrder { column: 1, ascending: true });
        assert_eq!(rows, vec![2, 1, 0, 3]);

        sort_rows(&records, &mut rows, SortOrder { column: 1, ascending: false });
        assert_eq!(rows, vec![3, 0, 1, 2]);
    }

    #[test]
    fn absent_values_sort_last() {
        let records = inventory();
        let mut rows = vec![3, 2, 1, 0];
        sort_rows(&records, &mut rows, SortOrder { column: 3, ascending: false });
        assert_eq!(&rows[..2], &[1, 0]);
        // stable for the two records without a region
        assert_eq!(&rows[2..], &[3, 2]);
    }
}
