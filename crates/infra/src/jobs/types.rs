//! Core job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use stockroute_core::EngineError;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The long-running engine operations that run as jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Optimization,
    Layout,
}

impl JobKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            JobKind::Optimization => "optimization",
            JobKind::Layout => "layout",
        }
    }
}

/// Job execution status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Spawned, worker not started yet
    Pending,
    Running,
    Completed,
    Failed { error: String },
    /// Stopped at a cancellation checkpoint
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed { .. } | JobStatus::Cancelled
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("job worker panicked: {0}")]
    Panicked(String),

    #[error("failed to spawn job worker: {0}")]
    Spawn(String),
}

impl JobError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, JobError::Engine(e) if e.is_cancellation())
    }
}

/// Observable state of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// 0..=100, never decreasing.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(kind: JobKind) -> Self {
        Self {
            id: JobId::new(),
            kind,
            status: JobStatus::Pending,
            progress: 0,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: String) {
        self.status = JobStatus::Failed { error };
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock run time, once finished.
    pub fn duration_ms(&self) -> Option<u64> {
        let (start, end) = (self.started_at?, self.finished_at?);
        Some((end - start).num_milliseconds().max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_lifecycle() {
        let mut job = JobRecord::new(JobKind::Optimization);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.duration_ms().is_none());

        job.mark_running();
        assert_eq!(job.status, JobStatus::Running);
        assert!(!job.status.is_terminal());

        job.mark_completed();
        assert!(job.status.is_terminal());
        assert_eq!(job.progress, 100);
        assert!(job.duration_ms().is_some());
    }

    #[test]
    fn cancellation_is_recognised_through_the_engine_error() {
        assert!(JobError::Engine(EngineError::Cancelled).is_cancellation());
        assert!(!JobError::Panicked("boom".into()).is_cancellation());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&JobKind::Optimization).unwrap();
        assert_eq!(json, "\"optimization\"");
        assert_eq!(JobKind::Layout.type_name(), "layout");
    }
}
