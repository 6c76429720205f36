use serde_json::{Map, Value};
use std::sync::Arc;

/// Fields shown as table columns, in display order.
pub const DISPLAY_COLUMNS: [&str; 6] = [
    "URL",
    "Account",
    "Date",
    "Region",
    "DBHostname",
    "LoadBalancer",
];

pub const ID_FIELD: &str = "id";

/// One inventory entry. Keeps the server's field order, values are stringified scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, Option<String>)>,
}

/// Records in server response order, shared read-only between view and export.
pub type Dataset = Arc<Vec<Record>>;

impl Record {
    pub fn from_json_object(object: Map<String, Value>) -> Self {
        object
            .into_iter()
            .map(|(name, value)| (name, stringify(value)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    /// Present values only, absent fields never match anything.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(|(_, v)| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).filter(|id| !id.is_empty())
    }

    /// The six table cells, blank where the record lacks the field.
    pub fn display_cells(&self) -> Vec<String> {
        DISPLAY_COLUMNS
            .iter()
            .map(|c| self.get(c).unwrap_or_default().to_string())
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, Option<String>)>>(iter: T) -> Self {
        Record {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Rendering key of a table row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Id(String),
    /// Index in the full dataset, so keys do not shift while filtering.
    Position(usize),
}

impl RowKey {
    pub fn for_record(record: &Record, dataset_idx: usize) -> Self {
        match record.id() {
            Some(id) => RowKey::Id(id.to_string()),
            None => RowKey::Position(dataset_idx),
        }
    }
}

#[cfg(test)]
pub(crate) fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Some(v.to_string())))
        .collect()
}
