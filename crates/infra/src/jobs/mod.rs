//! Background jobs for the long-running engine operations.
//!
//! ## Design
//!
//! - One OS thread per job, named after the job kind
//! - Cooperative cancellation through the job's `CancellationToken`
//! - Progress and status observable through the `JobHandle` while running
//! - Results are handed back through a channel; worker panics are reported
//!   as `JobError::Panicked` instead of propagating

pub mod runner;
pub mod types;

pub use runner::{JobHandle, spawn_job};
pub use types::{JobError, JobId, JobKind, JobRecord, JobStatus};
