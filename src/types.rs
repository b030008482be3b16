//! Core types for the vitaledger engine
//!
//! This module defines the data structures that flow through each stage of a
//! day's derivation: provider-native time series, normalized sessions and
//! samples, derived summaries, and the final daily record.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Activity type the provider reserves for sleep sessions
pub const SLEEP_ACTIVITY_TYPE: u32 = 72;

/// Half-open `[start, end)` window in UTC epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    /// Create a window, enforcing `start < end`.
    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self, EngineError> {
        if start_ms >= end_ms {
            return Err(EngineError::InvalidWindow {
                start: start_ms,
                end: end_ms,
            });
        }
        Ok(Self { start_ms, end_ms })
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms - self.start_ms
    }

    /// Half-open membership test
    pub fn contains_ms(&self, t: i64) -> bool {
        t >= self.start_ms && t < self.end_ms
    }

    /// The same end with the start pushed back, e.g. for sleep lookback
    pub fn extended_back(&self, ms: i64) -> Self {
        Self {
            start_ms: self.start_ms - ms,
            end_ms: self.end_ms,
        }
    }

    /// Whether another interval overlaps this window
    pub fn overlaps(&self, start_ms: i64, end_ms: i64) -> bool {
        start_ms < self.end_ms && end_ms > self.start_ms
    }
}

// --- Provider-native query result shapes ---
//
// The raw-data collaborator returns loosely shaped nested structures. They are
// validated and defaulted here, at the boundary, so the rest of the engine
// never touches dynamic shapes.

/// One value inside a keyed map point (nutrition breakdowns)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fp_val: Option<f64>,
}

/// A keyed entry of a map-valued point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: String,
    pub value: MapValue,
}

/// A single reading; exactly one of the kinds is normally populated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Value {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub int_val: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fp_val: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map_val: Vec<MapEntry>,
}

impl Value {
    pub fn integer(v: i64) -> Self {
        Self {
            int_val: Some(v),
            ..Default::default()
        }
    }

    pub fn float(v: f64) -> Self {
        Self {
            fp_val: Some(v),
            ..Default::default()
        }
    }
}

/// One reading interval with its values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub start_nanos: i64,
    pub end_nanos: i64,
    #[serde(default)]
    pub values: Vec<Value>,
}

impl Point {
    /// Covered duration in minutes; clamped to zero for inverted intervals
    pub fn duration_minutes(&self) -> f64 {
        ((self.end_nanos - self.start_nanos).max(0) as f64) / 1e9 / 60.0
    }
}

/// All points of one metric within a bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub points: Vec<Point>,
}

/// A time slice of a query response, one dataset per queried metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

// --- Normalized engine inputs ---

/// A wall-clock sample, already stripped of its date.
///
/// Two samples with the same time-of-day on different physical days are
/// indistinguishable; sleep windows are resolved per session, so this never
/// becomes ambiguous in practice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Local "HH:MM" label
    pub time: String,
    pub value: f64,
}

impl Sample {
    pub fn new(time: impl Into<String>, value: f64) -> Self {
        Self {
            time: time.into(),
            value,
        }
    }
}

/// A labeled provider session, normalized at the fetch boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    pub activity_type: u32,
    pub start_ms: i64,
    pub end_ms: i64,
    /// Local "HH:MM" start label
    pub start_local: String,
    /// Local "HH:MM" end label
    pub end_local: String,
    pub duration_minutes: f64,
}

impl Session {
    pub fn is_sleep(&self) -> bool {
        self.activity_type == SLEEP_ACTIVITY_TYPE
    }
}

/// Immutable mapping from provider activity-type codes to display labels.
///
/// Injected into the analyzers rather than living as a module global, so a
/// deployment can carry its own table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCatalog {
    labels: BTreeMap<u32, String>,
}

impl ActivityCatalog {
    pub fn new(entries: impl IntoIterator<Item = (u32, String)>) -> Self {
        Self {
            labels: entries.into_iter().collect(),
        }
    }

    /// Display label for an activity type, defaulting to `"Sport <type>"`
    pub fn label(&self, activity_type: u32) -> String {
        self.labels
            .get(&activity_type)
            .cloned()
            .unwrap_or_else(|| format!("Sport {activity_type}"))
    }
}

impl Default for ActivityCatalog {
    fn default() -> Self {
        Self::new(
            [
                (7, "Walking"),
                (8, "Running"),
                (9, "Aerobics"),
                (28, "Soccer"),
                (30, "Soccer"),
                (58, "Hiking"),
                (72, "Sleep"),
                (88, "Soccer"),
                (97, "Strength training"),
            ]
            .into_iter()
            .map(|(code, label)| (code, label.to_string())),
        )
    }
}

// --- Derived summaries ---

/// Per-stage sleep minutes accumulated across all qualifying sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMinutes {
    pub awake: f64,
    pub asleep: f64,
    pub light: f64,
    pub deep: f64,
    pub rem: f64,
    pub out_of_bed: f64,
}

impl StageMinutes {
    /// Minutes actually at rest; excludes awake and out-of-bed time
    pub fn rest_minutes(&self) -> f64 {
        self.asleep + self.light + self.deep + self.rem
    }
}

/// Cumulative sleep breakdown for the day's lookback window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleepSummary {
    /// Total rest minutes across all sleep sessions
    pub total_minutes: f64,
    pub stages: StageMinutes,
    /// `round(100 * rest / (rest + awake))`; 0 when no rest was recorded
    pub efficiency_score: u8,
    /// Display start of the longest session, local "HH:MM"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// Display end of the longest session, local "HH:MM"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl SleepSummary {
    pub fn total_hours(&self) -> f64 {
        (self.total_minutes / 60.0 * 100.0).round() / 100.0
    }
}

/// Body composition estimates.
///
/// Every field is optional: an absent sensor means an absent field, never a
/// fabricated zero. Derived fields are present only when their prerequisite
/// inputs are.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyComposition {
    pub weight_kg: Option<f64>,
    pub height_m: Option<f64>,
    pub bmi: Option<f64>,
    pub body_fat_percent: Option<f64>,
    pub body_fat_kg: Option<f64>,
    pub lean_mass_kg: Option<f64>,
    pub muscle_mass_kg: Option<f64>,
    /// Estimated, not measured: assumes a fixed age
    pub bmr_kcal: Option<i64>,
    pub body_water_percent: Option<f64>,
    pub body_water_kg: Option<f64>,
}

/// Vitals averaged over samples inside the resolved sleep window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NightVitals {
    pub avg_spo2: Option<f64>,
    pub avg_body_temp: Option<f64>,
    pub avg_respiratory_rate: Option<f64>,
    pub sample_count: usize,
}

/// Core activity aggregates, kept whole for the audit dump
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreAggregates {
    /// Reconciled step count (max of merged and wearable streams)
    pub steps: i64,
    pub steps_merged: i64,
    pub steps_wearable: i64,
    pub distance_m: f64,
    pub calories_kcal: f64,
    pub cardio_points: f64,
    pub active_minutes: i64,
    pub floors: f64,
    pub power_avg_watts: Option<f64>,
}

/// A non-sleep session with its catalog label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportActivity {
    pub name: String,
    pub duration_minutes: f64,
    pub start_local: String,
}

/// Intermediate aggregates preserved for downstream audit and debugging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDayData {
    pub aggregates_dump: CoreAggregates,
    pub sleep_detailed: SleepSummary,
    pub night_vitals_raw: NightVitals,
    pub sport_activities: Vec<SportActivity>,
    pub heart_rate_samples: Vec<Sample>,
    pub step_source_used: String,
    pub last_sync: String,
}

/// The final output: a flat mapping of daily metrics keyed by calendar date.
///
/// The date string is the natural identity for persistence; repeated upserts
/// under the same key replace the prior row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetricsRecord {
    /// "YYYY-MM-DD" in the engine's civil timezone
    pub date: String,

    // Activity
    pub steps: i64,
    pub distance_m: i64,
    pub floors_climbed: i64,
    pub active_minutes: i64,
    pub cardio_points: i64,
    pub calories_burnt: i64,
    pub power_avg_watts: Option<f64>,

    // Vitals
    pub avg_hr: Option<i64>,
    pub resting_hr: Option<i64>,
    pub active_hr: Option<i64>,
    pub min_hr: Option<i64>,
    pub max_hr: Option<i64>,
    pub avg_spo2: Option<f64>,
    pub vo2_max: Option<f64>,

    // Medical spot measurements
    pub blood_pressure_sys: Option<f64>,
    pub blood_pressure_dia: Option<f64>,
    pub blood_glucose_avg: Option<f64>,
    pub body_temp_avg: Option<f64>,

    // Body composition
    pub weight_kg: Option<f64>,
    pub bmi: Option<f64>,
    pub body_fat_percent: Option<f64>,
    pub body_fat_kg: Option<f64>,
    pub lean_mass_kg: Option<f64>,
    pub muscle_mass_kg: Option<f64>,
    pub bmr_kcal: Option<i64>,
    pub body_water_percent: Option<f64>,
    pub body_water_kg: Option<f64>,

    // Sleep and composite scores
    pub sleep_hours_total: f64,
    pub sleep_score: u8,
    pub energy_score: u8,

    // Nutrition
    pub calories_intake: i64,
    pub water_ml: i64,

    pub raw: RawDayData,
}

impl DailyMetricsRecord {
    /// Persistence key
    pub fn date_key(&self) -> &str {
        &self.date
    }
}
