//! Engine configuration
//!
//! All policy knobs in one serde struct with sensible defaults: the civil
//! timezone that anchors day windows, lookback durations, the wearable model
//! hint for step-stream resolution, and the heuristic constants of the body
//! and energy estimators.

use serde::{Deserialize, Serialize};

use crate::body::BodyConstants;
use crate::energy::EnergyWeights;
use crate::types::ActivityCatalog;

/// Sleep sessions are searched this many hours before the day starts
pub const DEFAULT_SLEEP_LOOKBACK_HOURS: i64 = 14;

/// Body spot measurements are searched this many days back
pub const DEFAULT_BODY_LOOKBACK_DAYS: i64 = 30;

/// Vitals sampling bucket (5 minutes)
pub const DEFAULT_VITALS_BUCKET_MS: i64 = 300_000;

/// Configuration for [`crate::engine::DailyMetricsEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Civil timezone defining day boundaries
    pub timezone: chrono_tz::Tz,
    pub sleep_lookback_hours: i64,
    pub body_lookback_days: i64,
    pub vitals_bucket_ms: i64,
    /// Device-model substring identifying the preferred wearable's streams
    pub wearable_model_hint: String,
    pub activity_catalog: ActivityCatalog,
    pub body: BodyConstants,
    pub energy: EnergyWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Rome,
            sleep_lookback_hours: DEFAULT_SLEEP_LOOKBACK_HOURS,
            body_lookback_days: DEFAULT_BODY_LOOKBACK_DAYS,
            vitals_bucket_ms: DEFAULT_VITALS_BUCKET_MS,
            wearable_model_hint: "SM-R9".to_string(),
            activity_catalog: ActivityCatalog::default(),
            body: BodyConstants::default(),
            energy: EnergyWeights::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.timezone, chrono_tz::Europe::Rome);
        assert_eq!(config.sleep_lookback_hours, 14);
        assert_eq!(config.body_lookback_days, 30);
        assert_eq!(config.energy.cap, 100);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        let loaded = EngineConfig::from_json(&json).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let loaded =
            EngineConfig::from_json(r#"{"timezone": "UTC", "wearable_model_hint": "Fenix"}"#)
                .unwrap();
        assert_eq!(loaded.timezone, chrono_tz::UTC);
        assert_eq!(loaded.wearable_model_hint, "Fenix");
        assert_eq!(loaded.sleep_lookback_hours, DEFAULT_SLEEP_LOOKBACK_HOURS);
        assert_eq!(loaded.body, BodyConstants::default());
    }
}
