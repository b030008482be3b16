//! Raw data source contract and step-stream resolution
//!
//! The engine talks to exactly one collaborator for raw data: something that
//! can run time-ranged aggregate queries and list labeled sessions. Failures
//! from it are carried as [`FetchOutcome`] values, never as hard errors.

use serde::{Deserialize, Serialize};

use crate::error::FetchOutcome;
use crate::types::{Bucket, Session, TimeWindow};

/// Typed metrics the engine knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Steps,
    Distance,
    CaloriesExpended,
    CardioPoints,
    ActiveMinutes,
    FloorsClimbed,
    Power,
    HeartRate,
    RestingHeartRate,
    Spo2,
    RespiratoryRate,
    SleepSegment,
    Weight,
    Height,
    BodyFatPercent,
    WaterMass,
    BloodPressure,
    BloodGlucose,
    BodyTemperature,
    Nutrition,
    Hydration,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Steps => "steps",
            MetricKind::Distance => "distance",
            MetricKind::CaloriesExpended => "calories_expended",
            MetricKind::CardioPoints => "cardio_points",
            MetricKind::ActiveMinutes => "active_minutes",
            MetricKind::FloorsClimbed => "floors_climbed",
            MetricKind::Power => "power",
            MetricKind::HeartRate => "heart_rate",
            MetricKind::RestingHeartRate => "resting_heart_rate",
            MetricKind::Spo2 => "spo2",
            MetricKind::RespiratoryRate => "respiratory_rate",
            MetricKind::SleepSegment => "sleep_segment",
            MetricKind::Weight => "weight",
            MetricKind::Height => "height",
            MetricKind::BodyFatPercent => "body_fat_percent",
            MetricKind::WaterMass => "water_mass",
            MetricKind::BloodPressure => "blood_pressure",
            MetricKind::BloodGlucose => "blood_glucose",
            MetricKind::BodyTemperature => "body_temperature",
            MetricKind::Nutrition => "nutrition",
            MetricKind::Hydration => "hydration",
        }
    }
}

/// One requested metric, optionally pinned to a specific data stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricSelector {
    pub kind: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl MetricSelector {
    pub fn of(kind: MetricKind) -> Self {
        Self {
            kind,
            source_id: None,
        }
    }

    pub fn from_stream(kind: MetricKind, source_id: impl Into<String>) -> Self {
        Self {
            kind,
            source_id: Some(source_id.into()),
        }
    }
}

/// A time-ranged aggregate query.
///
/// The response carries one dataset per selector, in selector order. With
/// `bucket_ms` set the response is sliced into fixed-duration buckets;
/// otherwise a single bucket spans the whole window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateQuery {
    pub selectors: Vec<MetricSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_ms: Option<i64>,
}

impl AggregateQuery {
    pub fn of(kinds: impl IntoIterator<Item = MetricKind>) -> Self {
        Self {
            selectors: kinds.into_iter().map(MetricSelector::of).collect(),
            bucket_ms: None,
        }
    }

    pub fn with_selectors(selectors: Vec<MetricSelector>) -> Self {
        Self {
            selectors,
            bucket_ms: None,
        }
    }

    pub fn bucketed(mut self, bucket_ms: i64) -> Self {
        self.bucket_ms = Some(bucket_ms);
        self
    }
}

/// A discoverable step-count stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSourceDescriptor {
    pub stream_id: String,
    #[serde(default)]
    pub device_model: String,
    /// Derived streams are provider-cleaned; raw streams come straight off
    /// the sensor
    #[serde(default)]
    pub derived: bool,
}

/// The raw data source capability the engine depends on.
///
/// Implementations must convert provider-native fields to the canonical
/// shapes in [`crate::types`]; the engine never sees provider wire formats.
pub trait RawDataSource {
    /// Run a time-ranged aggregate query
    fn aggregate(&self, query: &AggregateQuery, window: TimeWindow) -> FetchOutcome<Vec<Bucket>>;

    /// List labeled sessions overlapping the window
    fn list_sessions(&self, window: TimeWindow) -> FetchOutcome<Vec<Session>>;

    /// Enumerate available step-count streams
    fn step_sources(&self) -> FetchOutcome<Vec<StepSourceDescriptor>>;
}

/// The generic merged step stream every provider account exposes
pub const MERGED_STEP_STREAM: &str = "derived:steps:merged";

/// Pick the most trustworthy step stream for the day.
///
/// Priority: a derived stream from the configured wearable, then any stream
/// from that wearable, then the merged fallback. Never fails; the absence of
/// the preferred device degrades silently.
pub fn resolve_step_stream(descriptors: &[StepSourceDescriptor], model_hint: &str) -> String {
    if let Some(ds) = descriptors
        .iter()
        .find(|d| d.derived && d.device_model.contains(model_hint))
    {
        return ds.stream_id.clone();
    }
    if let Some(ds) = descriptors
        .iter()
        .find(|d| d.device_model.contains(model_hint))
    {
        return ds.stream_id.clone();
    }
    MERGED_STEP_STREAM.to_string()
}

/// Reconcile the merged and wearable step counts for the same day.
///
/// Merging across sources can double-remove overlapping deltas, so the larger
/// count is authoritative: occasional overcounting is accepted to avoid
/// systematic undercounting.
pub fn reconcile_steps(merged: i64, wearable: i64) -> i64 {
    merged.max(wearable)
}
