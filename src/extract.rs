//! Extraction utilities
//!
//! Pull scalar values out of a provider dataset with numeric-kind-specific
//! semantics. Counters (steps, active minutes) are delta-accumulators and sum
//! across points; state snapshots (weight, power) take the last observed
//! value. Empty or malformed datasets degrade to zero/None, never an error.

use crate::types::{Dataset, Value};

/// Sum all integer-valued readings across the dataset's points.
pub fn integer_total(dataset: &Dataset) -> i64 {
    dataset
        .points
        .iter()
        .flat_map(|p| &p.values)
        .filter_map(|v| v.int_val)
        .sum()
}

/// Sum all float-valued readings across the dataset's points.
pub fn float_total(dataset: &Dataset) -> f64 {
    dataset
        .points
        .iter()
        .flat_map(|p| &p.values)
        .filter_map(|v| v.fp_val)
        .sum()
}

/// The most recent float reading, or None when no points were recorded.
pub fn latest_float(dataset: &Dataset) -> Option<f64> {
    latest_values(dataset)?.iter().find_map(|v| v.fp_val)
}

/// The full value list of the most recent point.
///
/// Multi-component spot measurements (blood pressure) pack systolic and
/// diastolic into one point's value list.
pub fn latest_values(dataset: &Dataset) -> Option<&[Value]> {
    dataset
        .points
        .iter()
        .max_by_key(|p| p.end_nanos)
        .map(|p| p.values.as_slice())
}

/// Sum float entries under a given key across map-valued points.
///
/// Nutrition points carry keyed breakdowns (calories, protein, ...) instead
/// of a single scalar.
pub fn keyed_float_total(dataset: &Dataset, key: &str) -> f64 {
    dataset
        .points
        .iter()
        .flat_map(|p| &p.values)
        .flat_map(|v| &v.map_val)
        .filter(|entry| entry.key == key)
        .filter_map(|entry| entry.value.fp_val)
        .sum()
}
