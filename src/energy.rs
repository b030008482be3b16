//! Composite energy score
//!
//! A coarse daily wellness heuristic in `[0, 100]` combining sleep duration,
//! step count and resting heart rate. Intentionally simple and monotonic in
//! each input; the weights are fixed policy thresholds, not learned.

use serde::{Deserialize, Serialize};

/// Scoring thresholds and weights, overridable through the engine
/// configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyWeights {
    pub sleep_points: u32,
    /// Minimum sleep minutes to earn the sleep contribution
    pub sleep_threshold_minutes: f64,
    pub rhr_points: u32,
    /// Resting HR must be strictly below this to earn the RHR contribution
    pub rhr_threshold_bpm: i64,
    pub steps_points: u32,
    /// Steps must strictly exceed this to earn the step contribution
    pub steps_threshold: i64,
    pub cap: u32,
}

impl Default for EnergyWeights {
    fn default() -> Self {
        Self {
            sleep_points: 40,
            sleep_threshold_minutes: 420.0,
            rhr_points: 30,
            rhr_threshold_bpm: 60,
            steps_points: 30,
            steps_threshold: 8000,
            cap: 100,
        }
    }
}

/// Compute the composite score for one day.
///
/// An unknown resting HR simply earns no RHR contribution.
pub fn energy_score(
    sleep_minutes: f64,
    steps: i64,
    resting_hr: Option<i64>,
    weights: &EnergyWeights,
) -> u8 {
    let mut score = 0u32;

    if sleep_minutes >= weights.sleep_threshold_minutes {
        score += weights.sleep_points;
    }
    if matches!(resting_hr, Some(rhr) if rhr < weights.rhr_threshold_bpm) {
        score += weights.rhr_points;
    }
    if steps > weights.steps_threshold {
        score += weights.steps_points;
    }

    // The configured cap may exceed what the record's u8 field can hold
    score.min(weights.cap).min(u8::MAX as u32) as u8
}
