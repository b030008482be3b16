//! Capture replay source
//!
//! A [`RawDataSource`] backed by a recorded capture file instead of a live
//! provider. The capture holds flat metric series, labeled sessions and step
//! stream descriptors; replay serves time-ranged slices of them, bucketed on
//! demand, exactly as a live collaborator would. Used by the CLI driver and
//! by pipeline tests.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, FetchOutcome};
use crate::source::{AggregateQuery, MetricSelector, RawDataSource, StepSourceDescriptor};
use crate::types::{Bucket, Dataset, MapEntry, Point, Session, TimeWindow, Value};
use crate::window::format_clock;

/// A recorded provider capture
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub series: Vec<RecordedSeries>,
    #[serde(default)]
    pub sessions: Vec<RecordedSession>,
    #[serde(default)]
    pub step_sources: Vec<StepSourceDescriptor>,
}

/// All recorded points of one metric stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSeries {
    pub kind: crate::source::MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub points: Vec<RecordedPoint>,
}

/// One recorded reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedPoint {
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int_val: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp_val: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub map_val: Vec<MapEntry>,
}

/// One recorded provider session, pre-normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSession {
    pub name: String,
    pub activity_type: u32,
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Replays a capture as a raw data source
pub struct ReplaySource {
    capture: Capture,
    tz: Tz,
}

impl ReplaySource {
    pub fn new(capture: Capture, tz: Tz) -> Self {
        Self { capture, tz }
    }

    pub fn from_json(json: &str, tz: Tz) -> Result<Self, EngineError> {
        let capture: Capture = serde_json::from_str(json)
            .map_err(|e| EngineError::CaptureError(e.to_string()))?;
        Ok(Self::new(capture, tz))
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    fn find_series(&self, selector: &MetricSelector) -> Option<&RecordedSeries> {
        match &selector.source_id {
            Some(id) => self
                .capture
                .series
                .iter()
                .find(|s| s.kind == selector.kind && s.source_id.as_deref() == Some(id.as_str())),
            // An unpinned selector gets the provider-merged stream when one
            // exists, otherwise the first stream of that kind
            None => self
                .capture
                .series
                .iter()
                .find(|s| s.kind == selector.kind && s.source_id.is_none())
                .or_else(|| self.capture.series.iter().find(|s| s.kind == selector.kind)),
        }
    }

    fn dataset_for(&self, selector: &MetricSelector, slice: TimeWindow) -> Dataset {
        let Some(series) = self.find_series(selector) else {
            return Dataset::default();
        };

        let mut points: Vec<&RecordedPoint> = series
            .points
            .iter()
            .filter(|p| slice.contains_ms(p.start_ms))
            .collect();
        points.sort_by_key(|p| p.start_ms);

        Dataset {
            source_id: series.source_id.clone(),
            points: points
                .into_iter()
                .map(|p| Point {
                    start_nanos: p.start_ms * 1_000_000,
                    end_nanos: p.end_ms * 1_000_000,
                    values: vec![Value {
                        int_val: p.int_val,
                        fp_val: p.fp_val,
                        map_val: p.map_val.clone(),
                    }],
                })
                .collect(),
        }
    }
}

impl RawDataSource for ReplaySource {
    fn aggregate(&self, query: &AggregateQuery, window: TimeWindow) -> FetchOutcome<Vec<Bucket>> {
        let slices: Vec<TimeWindow> = match query.bucket_ms {
            Some(bucket_ms) if bucket_ms > 0 => {
                let mut slices = Vec::new();
                let mut start = window.start_ms;
                while start < window.end_ms {
                    let end = (start + bucket_ms).min(window.end_ms);
                    slices.push(TimeWindow {
                        start_ms: start,
                        end_ms: end,
                    });
                    start = end;
                }
                slices
            }
            _ => vec![window],
        };

        let buckets: Vec<Bucket> = slices
            .into_iter()
            .map(|slice| Bucket {
                start_ms: slice.start_ms,
                end_ms: slice.end_ms,
                datasets: query
                    .selectors
                    .iter()
                    .map(|sel| self.dataset_for(sel, slice))
                    .collect(),
            })
            .collect();

        let total_points: usize = buckets
            .iter()
            .flat_map(|b| &b.datasets)
            .map(|d| d.points.len())
            .sum();
        if total_points == 0 {
            return FetchOutcome::Empty;
        }
        FetchOutcome::Data(buckets)
    }

    fn list_sessions(&self, window: TimeWindow) -> FetchOutcome<Vec<Session>> {
        let sessions: Vec<Session> = self
            .capture
            .sessions
            .iter()
            .filter(|s| window.overlaps(s.start_ms, s.end_ms))
            .map(|s| Session {
                name: s.name.clone(),
                activity_type: s.activity_type,
                start_ms: s.start_ms,
                end_ms: s.end_ms,
                start_local: format_clock(s.start_ms, self.tz),
                end_local: format_clock(s.end_ms, self.tz),
                duration_minutes: ((s.end_ms - s.start_ms).max(0) as f64) / 60_000.0,
            })
            .collect();
        if sessions.is_empty() {
            return FetchOutcome::Empty;
        }
        FetchOutcome::Data(sessions)
    }

    fn step_sources(&self) -> FetchOutcome<Vec<StepSourceDescriptor>> {
        if self.capture.step_sources.is_empty() {
            return FetchOutcome::Empty;
        }
        FetchOutcome::Data(self.capture.step_sources.clone())
    }
}
