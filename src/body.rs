//! Body composition estimation
//!
//! Derives BMI, BMR, fat mass, lean mass and body water from the latest
//! available spot measurements. Weigh-ins are infrequent and manual, so the
//! inputs come from an extended lookback window and each is independently
//! optional: nothing is derived without its prerequisites, and nothing is
//! fabricated.
//!
//! Several outputs are estimates, not measurements. BMR uses the
//! Mifflin-St Jeor equation with an assumed age because no sensor reports
//! one; muscle mass and body water use population-level ratios.

use serde::{Deserialize, Serialize};

use crate::types::BodyComposition;

/// Heuristic constants for the estimator. Domain-tuned defaults, overridable
/// per deployment through the engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConstants {
    /// No sensor reports age; the BMR estimate assumes this one
    pub assumed_age_years: f64,
    /// Used when no height measurement exists in the lookback window
    pub default_height_m: f64,
    /// Skeletal muscle as a fraction of lean mass (empirical)
    pub muscle_mass_ratio: f64,
    /// Water fraction of lean tissue (standard physiological constant)
    pub lean_water_fraction: f64,
}

impl Default for BodyConstants {
    fn default() -> Self {
        Self {
            assumed_age_years: 30.0,
            default_height_m: 1.75,
            muscle_mass_ratio: 0.54,
            lean_water_fraction: 0.73,
        }
    }
}

/// Latest spot measurements feeding the estimator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyInputs {
    pub weight_kg: Option<f64>,
    pub height_m: Option<f64>,
    pub body_fat_percent: Option<f64>,
    /// Directly measured water mass, rare but preferred when present
    pub water_mass_kg: Option<f64>,
}

/// Estimate body composition from the latest available readings.
pub fn estimate(inputs: &BodyInputs, constants: &BodyConstants) -> BodyComposition {
    let mut body = BodyComposition {
        weight_kg: inputs.weight_kg,
        height_m: inputs.height_m,
        body_fat_percent: inputs.body_fat_percent,
        ..Default::default()
    };

    let Some(weight) = inputs.weight_kg else {
        // Without a weight reading nothing downstream can be derived
        return body;
    };

    let height_m = inputs.height_m.unwrap_or(constants.default_height_m);
    body.bmi = Some(round1(weight / (height_m * height_m)));

    // Mifflin-St Jeor with the assumed-age constant
    let height_cm = height_m * 100.0;
    body.bmr_kcal = Some(
        (10.0 * weight + 6.25 * height_cm - 5.0 * constants.assumed_age_years + 5.0).round()
            as i64,
    );

    if let Some(fat_percent) = inputs.body_fat_percent {
        let fat_kg = round2(weight * fat_percent / 100.0);
        let lean_kg = weight - fat_kg;
        body.body_fat_kg = Some(fat_kg);
        body.lean_mass_kg = Some(lean_kg);
        body.muscle_mass_kg = Some(round2(lean_kg * constants.muscle_mass_ratio));
    }

    // Prefer a directly measured water mass; fall back to the lean-tissue
    // estimate; leave absent when neither input exists.
    if let Some(water_kg) = inputs.water_mass_kg {
        body.body_water_kg = Some(round2(water_kg));
        body.body_water_percent = Some(round2(water_kg / weight * 100.0));
    } else if let Some(lean_kg) = body.lean_mass_kg {
        let water_kg = round2(lean_kg * constants.lean_water_fraction);
        body.body_water_kg = Some(water_kg);
        body.body_water_percent = Some(round2(water_kg / weight * 100.0));
    }

    body
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bmi_and_bmr_from_weight_and_height() {
        let inputs = BodyInputs {
            weight_kg: Some(70.0),
            height_m: Some(1.75),
            ..Default::default()
        };
        let body = estimate(&inputs, &BodyConstants::default());

        assert_eq!(body.bmi, Some(22.9));
        // 10*70 + 6.25*175 - 5*30 + 5 = 1648.75 -> 1649
        assert_eq!(body.bmr_kcal, Some(1649));
        assert_eq!(body.body_fat_kg, None);
        assert_eq!(body.body_water_kg, None);
    }

    #[test]
    fn test_fat_lean_and_muscle_derivation() {
        let inputs = BodyInputs {
            weight_kg: Some(70.0),
            height_m: Some(1.75),
            body_fat_percent: Some(20.0),
            ..Default::default()
        };
        let body = estimate(&inputs, &BodyConstants::default());

        assert_eq!(body.body_fat_kg, Some(14.0));
        assert_eq!(body.lean_mass_kg, Some(56.0));
        assert_eq!(body.muscle_mass_kg, Some(30.24));
    }

    #[test]
    fn test_measured_water_mass_preferred() {
        let inputs = BodyInputs {
            weight_kg: Some(70.0),
            body_fat_percent: Some(20.0),
            water_mass_kg: Some(42.0),
            ..Default::default()
        };
        let body = estimate(&inputs, &BodyConstants::default());

        assert_eq!(body.body_water_kg, Some(42.0));
        assert_eq!(body.body_water_percent, Some(60.0));
    }

    #[test]
    fn test_water_estimated_from_lean_mass_when_unmeasured() {
        let inputs = BodyInputs {
            weight_kg: Some(70.0),
            body_fat_percent: Some(20.0),
            ..Default::default()
        };
        let body = estimate(&inputs, &BodyConstants::default());

        // lean 56.0 * 0.73 = 40.88
        assert_eq!(body.body_water_kg, Some(40.88));
        assert_eq!(body.body_water_percent, Some(58.4));
    }

    #[test]
    fn test_missing_height_uses_default_estimate() {
        let inputs = BodyInputs {
            weight_kg: Some(70.0),
            ..Default::default()
        };
        let body = estimate(&inputs, &BodyConstants::default());

        // Default height 1.75 m feeds the computation but is not reported
        // as a measurement
        assert_eq!(body.bmi, Some(22.9));
        assert_eq!(body.height_m, None);
    }

    #[test]
    fn test_no_weight_means_no_derived_fields() {
        let inputs = BodyInputs {
            height_m: Some(1.80),
            body_fat_percent: Some(18.0),
            water_mass_kg: Some(40.0),
            ..Default::default()
        };
        let body = estimate(&inputs, &BodyConstants::default());

        assert_eq!(body.weight_kg, None);
        assert_eq!(body.bmi, None);
        assert_eq!(body.bmr_kcal, None);
        assert_eq!(body.body_fat_kg, None);
        assert_eq!(body.body_water_percent, None);
        // Observed inputs still pass through
        assert_eq!(body.height_m, Some(1.80));
        assert_eq!(body.body_fat_percent, Some(18.0));
    }
}
