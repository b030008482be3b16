//! Vitaledger - Daily health metrics derivation engine for wearable data
//!
//! Vitaledger turns raw multi-sensor wearable data into one reconciled record
//! per calendar day through a deterministic pipeline: step stream resolution →
//! aggregate extraction → sleep staging → heart-rate partitioning → body and
//! energy estimation → record assembly.
//!
//! ## Modules
//!
//! - **Engine**: Orchestrates the per-day derivation over a raw data source
//! - **Replay**: File-backed raw data source for recorded captures

pub mod body;
pub mod config;
pub mod energy;
pub mod engine;
pub mod error;
pub mod extract;
pub mod heart;
pub mod replay;
pub mod sink;
pub mod sleep;
pub mod source;
pub mod types;
pub mod window;

pub use config::EngineConfig;
pub use engine::DailyMetricsEngine;
pub use error::{EngineError, FetchOutcome};
pub use replay::{Capture, ReplaySource};
pub use sink::{JsonFileSink, MemorySink, MetricsSink};
pub use source::{RawDataSource, MERGED_STEP_STREAM};
pub use types::DailyMetricsRecord;

/// Engine version embedded in diagnostics
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for diagnostics
pub const PRODUCER_NAME: &str = "vitaledger";
