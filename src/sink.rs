//! Metrics persistence
//!
//! Records are keyed by their date string and upserted: writing the same day
//! twice replaces the prior row, so re-deriving a day is always safe. The
//! in-memory sink backs tests; the JSON file sink backs the CLI.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::types::DailyMetricsRecord;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Somewhere day records can be upserted by date
pub trait MetricsSink {
    fn upsert(&mut self, record: &DailyMetricsRecord) -> Result<(), SinkError>;
}

/// In-memory sink, ordered by date
#[derive(Debug, Default)]
pub struct MemorySink {
    records: BTreeMap<String, DailyMetricsRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: &str) -> Option<&DailyMetricsRecord> {
        self.records.get(date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl MetricsSink for MemorySink {
    fn upsert(&mut self, record: &DailyMetricsRecord) -> Result<(), SinkError> {
        self.records
            .insert(record.date_key().to_string(), record.clone());
        Ok(())
    }
}

/// Sink writing a single JSON file holding the date-keyed record map.
///
/// The whole map is rewritten on every upsert. Day records are small and day
/// batches are short, so simplicity wins over incremental writes here.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, DailyMetricsRecord>, SinkError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl MetricsSink for JsonFileSink {
    fn upsert(&mut self, record: &DailyMetricsRecord) -> Result<(), SinkError> {
        let mut records = self.load()?;
        records.insert(record.date_key().to_string(), record.clone());
        fs::write(&self.path, serde_json::to_string_pretty(&records)?)?;
        info!(date = record.date_key(), path = %self.path.display(), "record upserted");
        Ok(())
    }
}
