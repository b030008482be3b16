//! Daily metrics derivation pipeline
//!
//! One engine instance owns a raw data source and a configuration, and turns
//! a calendar date into a [`DailyMetricsRecord`]. Each metric group is fetched
//! independently; a failed group degrades to absent fields and a warning, it
//! never fails the day. Only an unrepresentable date or timezone boundary is
//! a hard error.

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::body::{self, BodyInputs};
use crate::config::EngineConfig;
use crate::energy::energy_score;
use crate::error::{EngineError, FetchOutcome};
use crate::extract;
use crate::heart;
use crate::sleep::SleepAnalyzer;
use crate::source::{
    reconcile_steps, resolve_step_stream, AggregateQuery, MetricKind, MetricSelector,
    RawDataSource,
};
use crate::types::{
    Bucket, CoreAggregates, DailyMetricsRecord, NightVitals, RawDayData, Sample, Session,
    SportActivity, TimeWindow,
};
use crate::window::{clock_range, format_clock, is_within, minutes_of_day};

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 86_400_000;

/// Key under which the nutrition stream reports energy intake
const NUTRIENT_CALORIES: &str = "calories";

/// Derives one [`DailyMetricsRecord`] per calendar date from a raw data
/// source.
pub struct DailyMetricsEngine<S: RawDataSource> {
    source: S,
    config: EngineConfig,
}

impl<S: RawDataSource> DailyMetricsEngine<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, EngineConfig::default())
    }

    pub fn with_config(source: S, config: EngineConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Derive the full metrics record for one calendar date.
    pub fn compute_day(&self, date: NaiveDate) -> Result<DailyMetricsRecord, EngineError> {
        let tz = self.config.timezone;
        let window = day_window(date, tz)?;
        debug!(date = %date, start_ms = window.start_ms, end_ms = window.end_ms, "deriving day");

        // Step stream discovery happens first so the core query can pin the
        // wearable stream alongside the merged one.
        let descriptors = settle(self.source.step_sources(), "step_sources");
        let step_stream = resolve_step_stream(&descriptors, &self.config.wearable_model_hint);

        let core_query = AggregateQuery::with_selectors(vec![
            MetricSelector::of(MetricKind::Steps),
            MetricSelector::from_stream(MetricKind::Steps, step_stream.clone()),
            MetricSelector::of(MetricKind::Distance),
            MetricSelector::of(MetricKind::CaloriesExpended),
            MetricSelector::of(MetricKind::CardioPoints),
            MetricSelector::of(MetricKind::ActiveMinutes),
        ]);
        let core = settle(self.source.aggregate(&core_query, window), "core_aggregates");

        let steps_merged = total_int(&core, 0);
        let steps_wearable = total_int(&core, 1);
        let aggregates = CoreAggregates {
            steps: reconcile_steps(steps_merged, steps_wearable),
            steps_merged,
            steps_wearable,
            distance_m: total_float(&core, 2),
            calories_kcal: total_float(&core, 3),
            cardio_points: total_float(&core, 4),
            active_minutes: total_int(&core, 5),
            floors: {
                let floors_query = AggregateQuery::of([MetricKind::FloorsClimbed]);
                let buckets = settle(self.source.aggregate(&floors_query, window), "floors");
                total_float(&buckets, 0)
            },
            power_avg_watts: {
                let power_query = AggregateQuery::of([MetricKind::Power]);
                let buckets = settle(self.source.aggregate(&power_query, window), "power");
                mean_of(&float_points(&buckets, 0)).map(round1)
            },
        };

        // Body measurements are sparse; look back far enough to find the most
        // recent reading of each.
        let body_window = TimeWindow::new(
            window.end_ms - self.config.body_lookback_days * MS_PER_DAY,
            window.end_ms,
        )?;
        let body_query = AggregateQuery::of([
            MetricKind::Weight,
            MetricKind::Height,
            MetricKind::BodyFatPercent,
            MetricKind::WaterMass,
        ]);
        let body_buckets = settle(self.source.aggregate(&body_query, body_window), "body");
        let composition = body::estimate(
            &BodyInputs {
                weight_kg: latest_float(&body_buckets, 0),
                height_m: latest_float(&body_buckets, 1),
                body_fat_percent: latest_float(&body_buckets, 2),
                water_mass_kg: latest_float(&body_buckets, 3),
            },
            &self.config.body,
        );

        // Medical spot measurements stay within the day itself and report
        // the latest reading, never an average.
        let medical_query = AggregateQuery::of([
            MetricKind::BloodPressure,
            MetricKind::BloodGlucose,
            MetricKind::BodyTemperature,
        ]);
        let medical = settle(self.source.aggregate(&medical_query, window), "medical");
        let (bp_sys, bp_dia) = blood_pressure(&medical, 0);
        let glucose = latest_float(&medical, 1);
        let body_temp = latest_float(&medical, 2);

        let vitals_query = AggregateQuery::of([
            MetricKind::HeartRate,
            MetricKind::Spo2,
            MetricKind::BodyTemperature,
            MetricKind::RespiratoryRate,
        ])
        .bucketed(self.config.vitals_bucket_ms);
        let vitals = settle(self.source.aggregate(&vitals_query, window), "vitals");
        let hr_samples = bucket_samples(&vitals, 0, tz);
        let spo2_samples = bucket_samples(&vitals, 1, tz);
        let temp_samples = bucket_samples(&vitals, 2, tz);
        let resp_samples = bucket_samples(&vitals, 3, tz);

        // Sessions reach back into the previous evening so a night of sleep
        // that started before midnight still counts toward this day.
        let session_window = window.extended_back(self.config.sleep_lookback_hours * MS_PER_HOUR);
        let sessions: Vec<Session> = settle(self.source.list_sessions(session_window), "sessions");

        let sleep = SleepAnalyzer::new(&self.source).summarize(&sessions);
        let sleep_window = clock_range(sleep.start.as_deref(), sleep.end.as_deref());

        let night_vitals = night_vitals(&spo2_samples, &temp_samples, &resp_samples, sleep_window);

        let rhr_query = AggregateQuery::of([MetricKind::RestingHeartRate]);
        let rhr_buckets = settle(self.source.aggregate(&rhr_query, window), "resting_heart_rate");
        let direct_rhr = latest_float(&rhr_buckets, 0);
        let resting_hr = heart::resolve_resting_hr(direct_rhr, &hr_samples, sleep_window);

        let nutrition_query = AggregateQuery::of([MetricKind::Nutrition, MetricKind::Hydration]);
        let nutrition = settle(self.source.aggregate(&nutrition_query, window), "nutrition");
        let calories_intake = keyed_total(&nutrition, 0, NUTRIENT_CALORIES) as i64;
        let water_ml = (keyed_total_or_float(&nutrition, 1) * 1000.0) as i64;

        let sport_activities: Vec<SportActivity> = sessions
            .iter()
            .filter(|s| !s.is_sleep() && window.overlaps(s.start_ms, s.end_ms))
            .map(|s| SportActivity {
                name: self.config.activity_catalog.label(s.activity_type),
                duration_minutes: s.duration_minutes,
                start_local: s.start_local.clone(),
            })
            .collect();

        let energy = energy_score(
            sleep.total_minutes,
            aggregates.steps,
            resting_hr,
            &self.config.energy,
        );

        Ok(DailyMetricsRecord {
            date: date.format("%Y-%m-%d").to_string(),

            steps: aggregates.steps,
            distance_m: aggregates.distance_m as i64,
            floors_climbed: aggregates.floors as i64,
            active_minutes: aggregates.active_minutes,
            cardio_points: aggregates.cardio_points as i64,
            calories_burnt: aggregates.calories_kcal as i64,
            power_avg_watts: aggregates.power_avg_watts,

            avg_hr: heart::avg_hr(&hr_samples),
            resting_hr,
            active_hr: heart::active_hr(&hr_samples, sleep_window),
            min_hr: heart::min_hr(&hr_samples),
            max_hr: heart::max_hr(&hr_samples),
            avg_spo2: mean_of(&values_of(&spo2_samples)).map(round1),
            // Never reported by the provider's aggregate surface
            vo2_max: None,

            blood_pressure_sys: bp_sys,
            blood_pressure_dia: bp_dia,
            blood_glucose_avg: glucose,
            body_temp_avg: body_temp,

            weight_kg: composition.weight_kg,
            bmi: composition.bmi,
            body_fat_percent: composition.body_fat_percent,
            body_fat_kg: composition.body_fat_kg,
            lean_mass_kg: composition.lean_mass_kg,
            muscle_mass_kg: composition.muscle_mass_kg,
            bmr_kcal: composition.bmr_kcal,
            body_water_percent: composition.body_water_percent,
            body_water_kg: composition.body_water_kg,

            sleep_hours_total: sleep.total_hours(),
            sleep_score: sleep.efficiency_score,
            energy_score: energy,

            calories_intake,
            water_ml,

            raw: RawDayData {
                aggregates_dump: aggregates,
                sleep_detailed: sleep,
                night_vitals_raw: night_vitals,
                sport_activities,
                heart_rate_samples: hr_samples,
                step_source_used: step_stream,
                last_sync: Utc::now().to_rfc3339(),
            },
        })
    }
}

/// The civil day as a half-open UTC window
fn day_window(date: NaiveDate, tz: Tz) -> Result<TimeWindow, EngineError> {
    let start = local_midnight(date, tz)?;
    let next = date
        .succ_opt()
        .ok_or_else(|| EngineError::InvalidDate(date.to_string()))?;
    let end = local_midnight(next, tz)?;
    TimeWindow::new(start, end)
}

fn local_midnight(date: NaiveDate, tz: Tz) -> Result<i64, EngineError> {
    let naive = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| EngineError::InvalidDate(date.to_string()))?;
    // DST gaps can swallow midnight; earliest() resolves ambiguity, the gap
    // case is an unrepresentable day boundary
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| EngineError::InvalidDate(format!("{date} has no midnight in {tz}")))
}

/// Collapse a fetch outcome to its data, defaulting Empty and Failed.
///
/// Failed outcomes are the provider's problem, not the day's: they are logged
/// and the metric group comes out zeroed.
fn settle<T: Default>(outcome: FetchOutcome<T>, what: &str) -> T {
    match outcome {
        FetchOutcome::Data(v) => v,
        FetchOutcome::Empty => T::default(),
        FetchOutcome::Failed(reason) => {
            warn!(query = what, reason = %reason, "raw data query failed, continuing without it");
            T::default()
        }
    }
}

fn total_int(buckets: &[Bucket], idx: usize) -> i64 {
    buckets
        .iter()
        .filter_map(|b| b.datasets.get(idx))
        .map(extract::integer_total)
        .sum()
}

fn total_float(buckets: &[Bucket], idx: usize) -> f64 {
    buckets
        .iter()
        .filter_map(|b| b.datasets.get(idx))
        .map(extract::float_total)
        .sum()
}

fn latest_float(buckets: &[Bucket], idx: usize) -> Option<f64> {
    // Buckets arrive in time order, so the last dataset with a reading wins
    buckets
        .iter()
        .filter_map(|b| b.datasets.get(idx))
        .filter_map(extract::latest_float)
        .last()
}

fn keyed_total(buckets: &[Bucket], idx: usize, key: &str) -> f64 {
    buckets
        .iter()
        .filter_map(|b| b.datasets.get(idx))
        .map(|d| extract::keyed_float_total(d, key))
        .sum()
}

/// Volume streams report plain floats; tolerate a keyed "volume" map too
fn keyed_total_or_float(buckets: &[Bucket], idx: usize) -> f64 {
    let keyed = keyed_total(buckets, idx, "volume");
    if keyed > 0.0 {
        keyed
    } else {
        total_float(buckets, idx)
    }
}

fn float_points(buckets: &[Bucket], idx: usize) -> Vec<f64> {
    buckets
        .iter()
        .filter_map(|b| b.datasets.get(idx))
        .flat_map(|d| &d.points)
        .filter_map(|p| p.values.first().and_then(|v| v.fp_val))
        .collect()
}

/// One wall-clock sample per bucket, labeled by the bucket's local start time
fn bucket_samples(buckets: &[Bucket], idx: usize, tz: Tz) -> Vec<Sample> {
    buckets
        .iter()
        .filter_map(|b| {
            let value = b
                .datasets
                .get(idx)?
                .points
                .first()?
                .values
                .first()?
                .fp_val?;
            Some(Sample::new(format_clock(b.start_ms, tz), value))
        })
        .collect()
}

fn blood_pressure(buckets: &[Bucket], idx: usize) -> (Option<f64>, Option<f64>) {
    let Some(values) = buckets
        .iter()
        .filter_map(|b| b.datasets.get(idx))
        .filter_map(extract::latest_values)
        .last()
    else {
        return (None, None);
    };
    (
        values.first().and_then(|v| v.fp_val),
        values.get(1).and_then(|v| v.fp_val),
    )
}

/// Averages of the vitals samples falling inside the resolved sleep window
fn night_vitals(
    spo2: &[Sample],
    temp: &[Sample],
    resp: &[Sample],
    sleep_window: Option<(u32, u32)>,
) -> NightVitals {
    let Some((start, end)) = sleep_window else {
        return NightVitals::default();
    };
    let in_window = |samples: &[Sample]| -> Vec<f64> {
        samples
            .iter()
            .filter(|s| minutes_of_day(&s.time).is_some_and(|t| is_within(t, start, end)))
            .map(|s| s.value)
            .collect()
    };
    let (spo2, temp, resp) = (in_window(spo2), in_window(temp), in_window(resp));
    NightVitals {
        sample_count: spo2.len() + temp.len() + resp.len(),
        avg_spo2: mean_of(&spo2).map(round1),
        avg_body_temp: mean_of(&temp).map(round1),
        avg_respiratory_rate: mean_of(&resp).map(round1),
    }
}

fn values_of(samples: &[Sample]) -> Vec<f64> {
    samples.iter().map(|s| s.value).collect()
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{Capture, RecordedPoint, RecordedSeries, RecordedSession, ReplaySource};
    use crate::source::StepSourceDescriptor;
    use pretty_assertions::assert_eq;

    // 2024-01-15T00:00:00Z
    const DAY_START: i64 = 1_705_276_800_000;
    const HOUR: i64 = 3_600_000;
    const MINUTE: i64 = 60_000;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn utc_config() -> EngineConfig {
        EngineConfig {
            timezone: chrono_tz::UTC,
            ..EngineConfig::default()
        }
    }

    fn int_point(start_ms: i64, v: i64) -> RecordedPoint {
        RecordedPoint {
            start_ms,
            end_ms: start_ms + MINUTE,
            int_val: Some(v),
            fp_val: None,
            map_val: vec![],
        }
    }

    fn fp_point(start_ms: i64, v: f64) -> RecordedPoint {
        RecordedPoint {
            start_ms,
            end_ms: start_ms + MINUTE,
            int_val: None,
            fp_val: Some(v),
            map_val: vec![],
        }
    }

    fn span_point(start_ms: i64, minutes: f64, stage: i64) -> RecordedPoint {
        RecordedPoint {
            start_ms,
            end_ms: start_ms + (minutes * MINUTE as f64) as i64,
            int_val: Some(stage),
            fp_val: None,
            map_val: vec![],
        }
    }

    fn series(kind: MetricKind, points: Vec<RecordedPoint>) -> RecordedSeries {
        RecordedSeries {
            kind,
            source_id: None,
            points,
        }
    }

    /// A full day of recorded data: a night of sleep crossing midnight, a
    /// morning run, body measurements from two days prior, and vitals.
    fn full_day_capture() -> Capture {
        let noon = DAY_START + 12 * HOUR;
        let sleep_start = DAY_START - HOUR; // 23:00 previous evening
        let sleep_end = DAY_START + 6 * HOUR + 30 * MINUTE; // 06:30

        Capture {
            series: vec![
                series(MetricKind::Steps, vec![int_point(DAY_START + HOUR, 9000)]),
                RecordedSeries {
                    kind: MetricKind::Steps,
                    source_id: Some("derived:steps:SM-R960".to_string()),
                    points: vec![int_point(DAY_START + HOUR, 9500)],
                },
                series(MetricKind::Distance, vec![fp_point(noon, 7250.6)]),
                series(MetricKind::CaloriesExpended, vec![fp_point(noon, 2200.4)]),
                series(MetricKind::CardioPoints, vec![fp_point(noon, 35.0)]),
                series(MetricKind::ActiveMinutes, vec![int_point(noon, 85)]),
                series(MetricKind::FloorsClimbed, vec![fp_point(noon, 12.0)]),
                series(
                    MetricKind::HeartRate,
                    vec![
                        fp_point(DAY_START + 2 * HOUR, 55.0),
                        fp_point(DAY_START + 3 * HOUR, 57.0),
                        fp_point(noon, 80.0),
                        fp_point(DAY_START + 18 * HOUR, 90.0),
                    ],
                ),
                series(
                    MetricKind::Spo2,
                    vec![
                        fp_point(DAY_START + 2 * HOUR, 98.0),
                        fp_point(DAY_START + 3 * HOUR, 97.0),
                    ],
                ),
                series(
                    MetricKind::BodyTemperature,
                    vec![
                        fp_point(DAY_START + 2 * HOUR, 36.5),
                        fp_point(DAY_START + 21 * HOUR, 36.9),
                    ],
                ),
                series(
                    MetricKind::BloodGlucose,
                    vec![
                        fp_point(DAY_START + 8 * HOUR, 95.0),
                        fp_point(DAY_START + 20 * HOUR, 110.0),
                    ],
                ),
                series(
                    MetricKind::RespiratoryRate,
                    vec![fp_point(DAY_START + 2 * HOUR, 14.0)],
                ),
                series(
                    MetricKind::SleepSegment,
                    vec![
                        span_point(sleep_start, 30.0, 1),
                        span_point(sleep_start + 30 * MINUTE, 240.0, 4),
                        span_point(sleep_start + 270 * MINUTE, 90.0, 5),
                        span_point(sleep_start + 360 * MINUTE, 90.0, 6),
                    ],
                ),
                series(
                    MetricKind::Weight,
                    vec![fp_point(DAY_START - 2 * 24 * HOUR, 70.0)],
                ),
                series(
                    MetricKind::Height,
                    vec![fp_point(DAY_START - 2 * 24 * HOUR, 1.75)],
                ),
                series(
                    MetricKind::Nutrition,
                    vec![RecordedPoint {
                        start_ms: noon,
                        end_ms: noon + MINUTE,
                        int_val: None,
                        fp_val: None,
                        map_val: vec![crate::types::MapEntry {
                            key: "calories".to_string(),
                            value: crate::types::MapValue {
                                fp_val: Some(1800.0),
                            },
                        }],
                    }],
                ),
                series(MetricKind::Hydration, vec![fp_point(noon, 2.5)]),
            ],
            sessions: vec![
                RecordedSession {
                    name: "Night sleep".to_string(),
                    activity_type: 72,
                    start_ms: sleep_start,
                    end_ms: sleep_end,
                },
                RecordedSession {
                    name: "Morning run".to_string(),
                    activity_type: 8,
                    start_ms: noon,
                    end_ms: noon + 45 * MINUTE,
                },
            ],
            step_sources: vec![StepSourceDescriptor {
                stream_id: "derived:steps:SM-R960".to_string(),
                device_model: "SM-R960".to_string(),
                derived: true,
            }],
        }
    }

    fn compute(capture: Capture) -> DailyMetricsRecord {
        let config = utc_config();
        let source = ReplaySource::new(capture, config.timezone);
        let engine = DailyMetricsEngine::with_config(source, config);
        engine.compute_day(date()).unwrap()
    }

    #[test]
    fn test_full_day_activity_aggregates() {
        let record = compute(full_day_capture());

        assert_eq!(record.date, "2024-01-15");
        // Wearable stream outcounts the merged one and wins
        assert_eq!(record.steps, 9500);
        assert_eq!(record.raw.aggregates_dump.steps_merged, 9000);
        assert_eq!(record.raw.aggregates_dump.steps_wearable, 9500);
        assert_eq!(record.raw.step_source_used, "derived:steps:SM-R960");
        assert_eq!(record.distance_m, 7250);
        assert_eq!(record.calories_burnt, 2200);
        assert_eq!(record.cardio_points, 35);
        assert_eq!(record.active_minutes, 85);
        assert_eq!(record.floors_climbed, 12);
    }

    #[test]
    fn test_full_day_sleep_and_energy() {
        let record = compute(full_day_capture());

        // 240 light + 90 deep + 90 rem = 420 rest minutes, 30 awake
        assert_eq!(record.sleep_hours_total, 7.0);
        assert_eq!(record.sleep_score, 93);
        assert_eq!(record.raw.sleep_detailed.start.as_deref(), Some("23:00"));
        assert_eq!(record.raw.sleep_detailed.end.as_deref(), Some("06:30"));
        // 40 (sleep at threshold) + 30 (resting HR 56) + 30 (steps over 8000)
        assert_eq!(record.energy_score, 100);
    }

    #[test]
    fn test_full_day_heart_partition() {
        let record = compute(full_day_capture());

        // 02:00 and 03:00 fall in the 23:00-06:30 sleep window
        assert_eq!(record.resting_hr, Some(56));
        assert_eq!(record.active_hr, Some(85));
        assert_eq!(record.avg_hr, Some(71));
        assert_eq!(record.min_hr, Some(55));
        assert_eq!(record.max_hr, Some(90));
        assert_eq!(record.raw.heart_rate_samples.len(), 4);
    }

    #[test]
    fn test_full_day_body_and_night_vitals() {
        let record = compute(full_day_capture());

        assert_eq!(record.weight_kg, Some(70.0));
        assert_eq!(record.bmi, Some(22.9));
        assert_eq!(record.bmr_kcal, Some(1649));
        assert_eq!(record.body_fat_percent, None);

        assert_eq!(record.avg_spo2, Some(97.5));
        // Medical fields are spot measurements: the latest reading wins
        assert_eq!(record.body_temp_avg, Some(36.9));
        assert_eq!(record.blood_glucose_avg, Some(110.0));
        // Night temperature still averages the in-window sampled stream
        assert_eq!(record.raw.night_vitals_raw.avg_body_temp, Some(36.5));
        assert_eq!(record.raw.night_vitals_raw.avg_spo2, Some(97.5));
        assert_eq!(record.raw.night_vitals_raw.avg_respiratory_rate, Some(14.0));
        assert_eq!(record.raw.night_vitals_raw.sample_count, 4);
        assert_eq!(record.vo2_max, None);
    }

    #[test]
    fn test_full_day_nutrition_and_sports() {
        let record = compute(full_day_capture());

        assert_eq!(record.calories_intake, 1800);
        assert_eq!(record.water_ml, 2500);

        assert_eq!(record.raw.sport_activities.len(), 1);
        assert_eq!(record.raw.sport_activities[0].name, "Running");
        assert_eq!(record.raw.sport_activities[0].duration_minutes, 45.0);
        assert_eq!(record.raw.sport_activities[0].start_local, "12:00");
    }

    #[test]
    fn test_empty_capture_still_yields_record() {
        let record = compute(Capture::default());

        assert_eq!(record.date, "2024-01-15");
        assert_eq!(record.steps, 0);
        assert_eq!(record.raw.step_source_used, crate::source::MERGED_STEP_STREAM);
        assert_eq!(record.sleep_hours_total, 0.0);
        assert_eq!(record.sleep_score, 0);
        assert_eq!(record.energy_score, 0);
        assert_eq!(record.avg_hr, None);
        assert_eq!(record.weight_kg, None);
        assert_eq!(record.calories_intake, 0);
    }

    /// A source where every query fails outright
    struct BrokenSource;

    impl RawDataSource for BrokenSource {
        fn aggregate(
            &self,
            _query: &AggregateQuery,
            _window: TimeWindow,
        ) -> FetchOutcome<Vec<Bucket>> {
            FetchOutcome::Failed("connection reset".to_string())
        }

        fn list_sessions(&self, _window: TimeWindow) -> FetchOutcome<Vec<Session>> {
            FetchOutcome::Failed("connection reset".to_string())
        }

        fn step_sources(&self) -> FetchOutcome<Vec<StepSourceDescriptor>> {
            FetchOutcome::Failed("connection reset".to_string())
        }
    }

    /// Serves the full capture, except sleep stage queries fail
    struct SleepFailingSource(ReplaySource);

    impl RawDataSource for SleepFailingSource {
        fn aggregate(
            &self,
            query: &AggregateQuery,
            window: TimeWindow,
        ) -> FetchOutcome<Vec<Bucket>> {
            if query
                .selectors
                .iter()
                .any(|s| s.kind == MetricKind::SleepSegment)
            {
                return FetchOutcome::Failed("stage stream unavailable".to_string());
            }
            self.0.aggregate(query, window)
        }

        fn list_sessions(&self, window: TimeWindow) -> FetchOutcome<Vec<Session>> {
            self.0.list_sessions(window)
        }

        fn step_sources(&self) -> FetchOutcome<Vec<StepSourceDescriptor>> {
            self.0.step_sources()
        }
    }

    #[test]
    fn test_sleep_fetch_failure_zeroes_sleep_keeps_activity() {
        let config = utc_config();
        let source = SleepFailingSource(ReplaySource::new(full_day_capture(), config.timezone));
        let engine = DailyMetricsEngine::with_config(source, config);
        let record = engine.compute_day(date()).unwrap();

        // Activity and vitals are unaffected by the failed stage stream
        assert_eq!(record.steps, 9500);
        assert_eq!(record.max_hr, Some(90));
        // A failed stage fetch must not invent a slept night
        assert_eq!(record.sleep_hours_total, 0.0);
        assert_eq!(record.sleep_score, 0);
        // 30 (resting HR) + 30 (steps); no sleep contribution
        assert_eq!(record.energy_score, 60);
    }

    #[test]
    fn test_source_failures_degrade_instead_of_erroring() {
        let engine = DailyMetricsEngine::with_config(BrokenSource, utc_config());
        let record = engine.compute_day(date()).unwrap();

        assert_eq!(record.date, "2024-01-15");
        assert_eq!(record.steps, 0);
        assert_eq!(record.resting_hr, None);
        assert_eq!(record.sleep_score, 0);
        assert!(record.raw.sport_activities.is_empty());
    }

    #[test]
    fn test_day_window_is_local_civil_day() {
        let window = day_window(date(), chrono_tz::UTC).unwrap();
        assert_eq!(window.start_ms, DAY_START);
        assert_eq!(window.duration_ms(), 24 * HOUR);

        // Rome midnight precedes UTC midnight in winter
        let rome = day_window(date(), chrono_tz::Europe::Rome).unwrap();
        assert_eq!(rome.start_ms, DAY_START - HOUR);
        assert_eq!(rome.duration_ms(), 24 * HOUR);
    }
}
