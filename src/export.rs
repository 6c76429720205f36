use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use crate::record::Record;

pub const EXPORT_FILE_NAME: &str = "users_data.xlsx";
pub const EXPORT_SHEET_NAME: &str = "Users Data";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    Empty,
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub path: PathBuf,
    pub sheet: String,
    pub records: usize,
    pub columns: usize,
    /// Sheet rows written, header included.
    pub rows: usize,
}

/// Cell layout of the exported sheet: header row plus one row per record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetGrid {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl SheetGrid {
    /// Header is the union of field names in first-seen order.
    pub fn from_records(records: &[Record]) -> Self {
        let mut header: Vec<String> = Vec::new();
        for record in records {
            for (name, _) in record.fields() {
                if !header.iter().any(|h| h == name) {
                    header.push(name.to_string());
                }
            }
        }

        let rows = records
            .iter()
            .map(|r| {
                header
                    .iter()
                    .map(|h| r.get(h).map(str::to_string))
                    .collect()
            })
            .collect();

        SheetGrid { header, rows }
    }

    /// Number of sheet rows including the header.
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }
}

/// Write all `records` into a single-sheet workbook at `path`.
pub fn export_records(records: &[Record], path: &Path) -> Result<ExportReport, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }
    let start_time = Instant::now();
    let grid = SheetGrid::from_records(records);
    debug!(
        "Exporting grid of {}x{} to {}",
        grid.row_count(),
        grid.header.len(),
        path.display()
    );

    let rows = write_workbook(&grid, path).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "Exported {} records to {} in {}ms",
        records.len(),
        path.display(),
        start_time.elapsed().as_millis()
    );
    Ok(ExportReport {
        path: path.to_path_buf(),
        sheet: EXPORT_SHEET_NAME.to_string(),
        records: records.len(),
        columns: grid.header.len(),
        rows,
    })
}

/// Returns the number of sheet rows written.
fn write_workbook(grid: &SheetGrid, path: &Path) -> Result<usize, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    for (cidx, name) in grid.header.iter().enumerate() {
        worksheet.write_string_with_format(0, column_number(cidx)?, name, &bold)?;
    }
    let mut written = 1;
    for (ridx, row) in grid.rows.iter().enumerate() {
        let sheet_row = u32::try_from(ridx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        written += 1;
        for (cidx, value) in row.iter().enumerate() {
            if let Some(value) = value {
                worksheet.write_string(sheet_row, column_number(cidx)?, value)?;
            }
        }
    }

    workbook.save(path)?;
    Ok(written)
}

fn column_number(idx: usize) -> Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::record;

    fn inventory() -> Vec<Record> {
        vec![
            record(&[("URL", "a"), ("Account", "1")]),
            record(&[("URL", "b"), ("Region", "eu-north-1")]),
            record(&[("Account", "3"), ("Owner", "ops")]),
        ]
    }

    #[test]
    fn header_is_union_in_first_seen_order() {
        let grid = SheetGrid::from_records(&inventory());
        assert_eq!(grid.header, vec!["URL", "Account", "Region", "Owner"]);
        assert_eq!(grid.row_count(), 4);
        assert_eq!(
            grid.rows[1],
            vec![Some("b".to_string()), None, Some("eu-north-1".to_string()), None]
        );
    }

    #[test]
    fn writes_workbook_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);

        let report = export_records(&inventory(), &path).unwrap();

        assert_eq!(report.sheet, "Users Data");
        assert_eq!(report.records, 3);
        assert_eq!(report.columns, 4);
        assert_eq!(report.rows, 4);
        assert_eq!(report.path, path);
        let bytes = std::fs::read(&path).unwrap();
        // xlsx is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn empty_dataset_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);

        assert!(matches!(export_records(&[], &path), Err(ExportError::Empty)));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_target_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join(EXPORT_FILE_NAME);

        match export_records(&inventory(), &path) {
            Err(ExportError::Write { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected write error, got {other:?}"),
        }
    }
}
