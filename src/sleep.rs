//! Sleep analysis
//!
//! Merges every sleep-labeled session in the lookback window into one
//! cumulative stage breakdown. Sessions without stage detail are not dropped;
//! their whole duration is credited as plain sleep. A *failed* stage fetch is
//! different from an empty one: it contributes nothing, so a collaborator
//! error never fabricates sleep. The longest session supplies the display
//! start/end labels.

use tracing::warn;

use crate::error::FetchOutcome;
use crate::source::{AggregateQuery, MetricKind, RawDataSource};
use crate::types::{Point, Session, SleepSummary, StageMinutes, TimeWindow};

// Provider stage-segment codes
const STAGE_AWAKE: i64 = 1;
const STAGE_ASLEEP: i64 = 2;
const STAGE_OUT_OF_BED: i64 = 3;
const STAGE_LIGHT: i64 = 4;
const STAGE_DEEP: i64 = 5;
const STAGE_REM: i64 = 6;

/// Sleep efficiency: rest share of time accounted as rest or awake.
///
/// Returns 0 when no rest minutes were recorded at all.
pub fn efficiency_score(rest_minutes: f64, awake_minutes: f64) -> u8 {
    if rest_minutes <= 0.0 {
        return 0;
    }
    (100.0 * rest_minutes / (rest_minutes + awake_minutes)).round() as u8
}

/// Accumulates stage breakdowns for the sleep sessions of one day
pub struct SleepAnalyzer<'a> {
    source: &'a dyn RawDataSource,
}

impl<'a> SleepAnalyzer<'a> {
    pub fn new(source: &'a dyn RawDataSource) -> Self {
        Self { source }
    }

    /// Summarize all sleep-labeled sessions.
    ///
    /// Returns a zeroed summary when the window holds no sleep sessions.
    /// Zero-duration or inverted sessions contribute nothing but never fail
    /// the day.
    pub fn summarize(&self, sessions: &[Session]) -> SleepSummary {
        let sleeps: Vec<&Session> = sessions.iter().filter(|s| s.is_sleep()).collect();
        if sleeps.is_empty() {
            return SleepSummary::default();
        }

        let mut stages = StageMinutes::default();
        for session in &sleeps {
            match self.fetch_stage_points(session) {
                FetchOutcome::Data(points) if !points.is_empty() => {
                    accumulate_stages(&mut stages, &points)
                }
                // No stage detail: credit the whole duration as plain sleep
                FetchOutcome::Data(_) | FetchOutcome::Empty => {
                    stages.asleep += session.duration_minutes.max(0.0)
                }
                // An error is not an empty night; the session counts for
                // nothing rather than being credited as slept through
                FetchOutcome::Failed(reason) => {
                    warn!(session = %session.name, %reason, "stage segment fetch failed, session skipped");
                }
            }
        }

        // The longest session carries the display window
        let main = sleeps
            .iter()
            .max_by_key(|s| s.end_ms.saturating_sub(s.start_ms));

        let rest = stages.rest_minutes();
        SleepSummary {
            total_minutes: rest,
            stages,
            efficiency_score: efficiency_score(rest, stages.awake),
            start: main.map(|s| s.start_local.clone()),
            end: main.map(|s| s.end_local.clone()),
        }
    }

    fn fetch_stage_points(&self, session: &Session) -> FetchOutcome<Vec<Point>> {
        let Ok(window) = TimeWindow::new(session.start_ms, session.end_ms) else {
            return FetchOutcome::Empty;
        };
        let query = AggregateQuery::of([MetricKind::SleepSegment]);
        self.source.aggregate(&query, window).map(|buckets| {
            buckets
                .into_iter()
                .flat_map(|b| b.datasets.into_iter().next())
                .flat_map(|d| d.points)
                .collect()
        })
    }
}

fn accumulate_stages(stages: &mut StageMinutes, points: &[Point]) {
    for point in points {
        let minutes = point.duration_minutes();
        let Some(code) = point.values.first().and_then(|v| v.int_val) else {
            continue;
        };
        match code {
            STAGE_AWAKE => stages.awake += minutes,
            STAGE_ASLEEP => stages.asleep += minutes,
            STAGE_OUT_OF_BED => stages.out_of_bed += minutes,
            STAGE_LIGHT => stages.light += minutes,
            STAGE_DEEP => stages.deep += minutes,
            STAGE_REM => stages.rem += minutes,
            _ => {}
        }
    }
}
