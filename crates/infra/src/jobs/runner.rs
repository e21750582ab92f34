//! Runs engine operations on named background threads.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread;

use tracing::{debug, error, info, warn};

use stockroute_core::{CancellationToken, EngineResult, ProgressSink, RunContext};

use super::types::{JobError, JobId, JobKind, JobRecord, JobStatus};

fn lock(record: &Mutex<JobRecord>) -> MutexGuard<'_, JobRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Progress sink writing into the shared job record.
struct RecordProgress(Arc<Mutex<JobRecord>>);

impl ProgressSink for RecordProgress {
    fn report(&self, percent: u8) {
        let mut record = lock(&self.0);
        record.progress = record.progress.max(percent);
    }
}

/// Handle to a job running on its own thread.
///
/// Dropping the handle detaches the worker; it still runs to completion.
#[derive(Debug)]
pub struct JobHandle<T> {
    record: Arc<Mutex<JobRecord>>,
    token: CancellationToken,
    result: mpsc::Receiver<Result<T, JobError>>,
    join: Option<thread::JoinHandle<()>>,
}

impl<T> JobHandle<T> {
    pub fn id(&self) -> JobId {
        lock(&self.record).id
    }

    pub fn kind(&self) -> JobKind {
        lock(&self.record).kind
    }

    /// Snapshot of the job record.
    pub fn record(&self) -> JobRecord {
        lock(&self.record).clone()
    }

    pub fn status(&self) -> JobStatus {
        lock(&self.record).status.clone()
    }

    pub fn progress(&self) -> u8 {
        lock(&self.record).progress
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Request cooperative cancellation; the job stops at its next checkpoint.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Block until the job finishes and take its result.
    pub fn wait(mut self) -> Result<T, JobError> {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        self.result
            .recv()
            .unwrap_or_else(|_| Err(JobError::Panicked("worker exited without a result".into())))
    }
}

/// Spawn `work` on a new thread with its own cancellation token and a
/// progress sink feeding the job record.
pub fn spawn_job<T, F>(kind: JobKind, work: F) -> Result<JobHandle<T>, JobError>
where
    T: Send + 'static,
    F: FnOnce(&RunContext) -> EngineResult<T> + Send + 'static,
{
    let record = Arc::new(Mutex::new(JobRecord::new(kind)));
    let token = CancellationToken::new();
    let ctx = RunContext::new(token.clone(), Arc::new(RecordProgress(record.clone())));
    let (tx, rx) = mpsc::channel();

    let worker_record = record.clone();
    let join = thread::Builder::new()
        .name(format!("stockroute-{}", kind.type_name()))
        .spawn(move || {
            let job_id = {
                let mut record = lock(&worker_record);
                record.mark_running();
                record.id
            };
            debug!(job_id = %job_id, kind = kind.type_name(), "job started");

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(&ctx)));
            let result = finish(&worker_record, job_id, outcome);
            let _ = tx.send(result);
        })
        .map_err(|e| JobError::Spawn(e.to_string()))?;

    Ok(JobHandle {
        record,
        token,
        result: rx,
        join: Some(join),
    })
}

fn finish<T>(
    record: &Mutex<JobRecord>,
    job_id: JobId,
    outcome: thread::Result<EngineResult<T>>,
) -> Result<T, JobError> {
    let mut record = lock(record);
    match outcome {
        Ok(Ok(value)) => {
            record.mark_completed();
            info!(job_id = %job_id, duration_ms = ?record.duration_ms(), "job completed");
            Ok(value)
        }
        Ok(Err(err)) if err.is_cancellation() => {
            record.mark_cancelled();
            info!(job_id = %job_id, "job cancelled");
            Err(err.into())
        }
        Ok(Err(err)) => {
            record.mark_failed(err.to_string());
            warn!(job_id = %job_id, error = %err, "job failed");
            Err(err.into())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            record.mark_failed(message.clone());
            error!(job_id = %job_id, panic = %message, "job worker panicked");
            Err(JobError::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
