//! Error types for vitaledger

use thiserror::Error;

/// Errors that can occur while deriving a day's metrics
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid time window: start {start} must precede end {end}")]
    InvalidWindow { start: i64, end: i64 },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid capture: {0}")]
    CaptureError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Outcome of a single raw-data query.
///
/// The raw-data collaborator never propagates a hard failure into the engine,
/// but the engine still distinguishes "no data" from "collaborator error" for
/// observability. Both degrade to null/zero fields downstream.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    /// The query returned usable data
    Data(T),
    /// The query succeeded but no points were recorded
    Empty,
    /// The collaborator failed; the reason is logged, never fatal
    Failed(String),
}

impl<T> FetchOutcome<T> {
    /// True when the collaborator reported a failure
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    /// The failure reason, if any
    pub fn failure(&self) -> Option<&str> {
        match self {
            FetchOutcome::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Map the contained data, preserving the Empty/Failed variants
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Data(v) => FetchOutcome::Data(f(v)),
            FetchOutcome::Empty => FetchOutcome::Empty,
            FetchOutcome::Failed(reason) => FetchOutcome::Failed(reason),
        }
    }

    /// Convert to an Option, collapsing Empty and Failed to None
    pub fn into_option(self) -> Option<T> {
        match self {
            FetchOutcome::Data(v) => Some(v),
            _ => None,
        }
    }
}
