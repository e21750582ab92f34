//! Runtime layer: configuration, background jobs, sessions and reporting.
//!
//! The engine crates are pure; this crate runs them off-thread, publishes
//! their results as snapshots and folds them into reports.

pub mod config;
pub mod jobs;
pub mod pipeline;
pub mod projections;
pub mod session;


pub use config::{ConfigError, EngineConfig};
pub use pipeline::{PipelineInput, PipelineReport, run_pipeline};
pub use projections::{Report, ResultAggregator, aggregate};
pub use session::{Session, SessionError, SessionId, Snapshot};
