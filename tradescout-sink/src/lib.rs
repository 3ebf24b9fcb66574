//! Result sink: durable accumulation of valuation records.
//!
//! One row is appended and flushed per work unit, so a mid-run crash loses
//! at most the unit that was in flight.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tradescout_common::ValuationRecord;
use tracing::debug;

/// Destination for completed records. Object-safe so harvesters can be
/// tested against an in-memory buffer.
pub trait RecordSink {
    fn append(&mut self, record: &ValuationRecord) -> anyhow::Result<()>;
    fn rows(&self) -> usize;
}

/// CSV file with the fixed 15-column layout. Opens in append mode so rows
/// persisted by an earlier attempt survive a retry; the header is written
/// only when the file is new or empty, so even an empty run leaves a
/// well-formed file.
pub struct CsvSink {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl CsvSink {
    pub fn create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let has_rows = std::fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open output file: {}", path.display()))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if !has_rows {
            writer.write_record(ValuationRecord::HEADERS)?;
            writer.flush()?;
        }
        debug!(target: "sink.csv", path = %path.display(), existing = has_rows, "sink opened");
        Ok(Self {
            writer,
            path,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, record: &ValuationRecord) -> anyhow::Result<()> {
        self.writer.serialize(record)?;
        // Flush per record; the run may die at any point.
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn rows(&self) -> usize {
        self.rows
    }
}

/// Buffers records in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<ValuationRecord>,
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &ValuationRecord) -> anyhow::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn rows(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: &str, model: &str) -> ValuationRecord {
        ValuationRecord {
            country: "Malaysia".into(),
            device_type: "Smartphone".into(),
            brand: "Apple".into(),
            model: model.into(),
            capacity: "128GB".into(),
            color: String::new(),
            launch_rrp: String::new(),
            condition: "Good".into(),
            value_type: "Trade-In".into(),
            currency: "MYR".into(),
            value: value.into(),
            source: "compasia".into(),
            updated_on: "2026-08-27".into(),
            updated_by: "tradescout".into(),
            comments: String::new(),
        }
    }

    #[test]
    fn header_is_written_on_create() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sink = CsvSink::create(&path).unwrap();
        assert_eq!(sink.rows(), 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        let first = contents.lines().next().unwrap();
        assert!(first.starts_with("Country,Device Type,Brand,Model"));
        assert!(first.ends_with("Comments"));
    }

    #[test]
    fn rows_are_visible_after_each_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::create(&path).unwrap();

        sink.append(&sample("1234", "iPhone 13 128GB")).unwrap();
        // Readable without dropping the writer; append flushes.
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("iPhone 13 128GB"));
        assert_eq!(sink.rows(), 1);

        sink.append(&sample("", "iPhone 12 64GB")).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 3);
        assert_eq!(sink.rows(), 2);
    }

    #[test]
    fn empty_value_serialises_as_empty_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.append(&sample("", "iPhone 13 128GB")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let row = contents.lines().nth(1).unwrap();
        // Currency directly followed by the empty value column.
        assert!(row.contains("MYR,,compasia"));
    }

    #[test]
    fn commas_in_fields_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.append(&sample("99", "iPhone 13, Product Red")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"iPhone 13, Product Red\""));
    }

    #[test]
    fn reopening_keeps_rows_from_a_previous_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        {
            let mut sink = CsvSink::create(&path).unwrap();
            sink.append(&sample("1234", "iPhone 13 128GB")).unwrap();
        }

        // A retry attempt reopens the same path.
        let mut sink = CsvSink::create(&path).unwrap();
        sink.append(&sample("56", "Galaxy S21 256GB")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Country,"));
        assert!(lines[1].contains("iPhone 13 128GB"));
        assert!(lines[2].contains("Galaxy S21 256GB"));
    }

    #[test]
    fn memory_sink_counts_rows() {
        let mut sink = MemorySink::default();
        sink.append(&sample("10", "A")).unwrap();
        sink.append(&sample("", "B")).unwrap();
        assert_eq!(sink.rows(), 2);
        assert!(sink.records[1].value.is_empty());
    }
}
