//! Ledger output: appending receipt records to a CSV file.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SinkError;
use crate::models::record::{ReceiptRecord, LEDGER_HEADERS};

/// Destination for parsed receipts.
pub trait RecordSink {
    /// Durably append one record.
    fn append(&self, record: &ReceiptRecord) -> Result<(), SinkError>;
}

/// CSV ledger that is opened, appended to, and closed on every call.
#[derive(Debug, Clone)]
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvLedger {
    fn append(&self, record: &ReceiptRecord) -> Result<(), SinkError> {
        append_record(&self.path, record)
    }
}

/// Append `record` to the CSV at `path`, writing the header row first when the
/// file is new or empty. Parent directories are created as needed.
pub fn append_record(path: &Path, record: &ReceiptRecord) -> Result<(), SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let needs_header = match fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => return Err(e.into()),
    };

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if needs_header {
        debug!("Writing ledger header to {}", path.display());
        wtr.write_record(LEDGER_HEADERS)?;
    }
    wtr.write_record(record.to_row())?;
    wtr.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(vendor: &str) -> ReceiptRecord {
        ReceiptRecord::new("2024-03-15", vendor, "内訳：文房具", "¥1,500", "")
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        rdr.records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = CsvLedger::new(dir.path().join("ledger.csv"));

        for i in 0..3 {
            ledger.append(&sample(&format!("店{i}"))).unwrap();
        }

        let rows = read_rows(ledger.path());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], LEDGER_HEADERS.to_vec());
        assert_eq!(rows[1], vec!["2024-03-15", "店0", "内訳：文房具", "¥1,500", "要調査", ""]);
        assert_eq!(rows[3][1], "店2");
    }

    #[test]
    fn test_existing_ledger_is_appended_without_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");

        append_record(&path, &sample("first")).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // A fresh sink on an existing file must not repeat the header.
        CsvLedger::new(&path).append(&sample("second")).unwrap();

        let after = fs::read_to_string(&path).unwrap();
        assert!(after.starts_with(&before));
        assert_eq!(after.matches("日付").count(), 1);
        assert_eq!(read_rows(&path).len(), 3);
    }

    #[test]
    fn test_empty_file_gets_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        fs::write(&path, "").unwrap();

        append_record(&path, &sample("x")).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "日付");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books/2024/ledger.csv");

        append_record(&path, &sample("x")).unwrap();

        assert!(path.is_file());
    }

    #[test]
    fn test_embedded_delimiters_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.csv");
        let record = ReceiptRecord::new("", "Shop, \"Main\"", "", "¥1,234", "");

        append_record(&path, &record).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows[1][1], "Shop, \"Main\"");
        assert_eq!(rows[1][3], "¥1,234");
        assert_eq!(rows[1].len(), 6);
    }
}
