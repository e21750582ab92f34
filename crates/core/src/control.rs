//! Cooperative cancellation and progress reporting for long-running engine work.
//!
//! The solver and the layout engine call [`RunContext::checkpoint`] before each
//! iteration and [`RunContext::report`] after it. Neither knows whether it runs
//! inline or on a background thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::error::{EngineError, EngineResult};

/// Receiver of progress percentages (0..=100).
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: u8);
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _percent: u8) {}
}

impl<F> ProgressSink for F
where
    F: Fn(u8) + Send + Sync,
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-run control handle passed into long-running operations.
pub struct RunContext {
    token: CancellationToken,
    sink: Arc<dyn ProgressSink>,
    last: AtomicU8,
}

impl core::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.token.is_cancelled())
            .field("progress", &self.progress())
            .finish()
    }
}

impl RunContext {
    pub fn new(token: CancellationToken, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            token,
            sink,
            last: AtomicU8::new(0),
        }
    }

    /// A context that can never be cancelled and reports nowhere.
    pub fn detached() -> Self {
        Self::new(CancellationToken::new(), Arc::new(NoopProgress))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fails with [`EngineError::Cancelled`] once cancellation was requested.
    pub fn checkpoint(&self) -> EngineResult<()> {
        if self.token.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    /// Report progress; values below the last reported one are ignored.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            self.sink.report(percent);
        }
    }

    /// Report `done / total` scaled into `[floor, ceil]`.
    pub fn report_between(&self, floor: u8, ceil: u8, done: usize, total: usize) {
        let total = total.max(1);
        let span = ceil.saturating_sub(floor) as usize;
        let scaled = floor as usize + span * done.min(total) / total;
        self.report(scaled.min(u8::MAX as usize) as u8);
    }

    pub fn progress(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn progress_is_monotonic() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |p: u8| seen.lock().unwrap().push(p)
        };
        let ctx = RunContext::new(CancellationToken::new(), Arc::new(sink));

        ctx.report(10);
        ctx.report(5);
        ctx.report(10);
        ctx.report(40);
        ctx.report(250);

        assert_eq!(*seen.lock().unwrap(), vec![10, 40, 100]);
        assert_eq!(ctx.progress(), 100);
    }

    #[test]
    fn report_between_scales_into_range() {
        let ctx = RunContext::detached();
        ctx.report_between(10, 90, 1, 2);
        assert_eq!(ctx.progress(), 50);
        ctx.report_between(10, 90, 5, 2);
        assert_eq!(ctx.progress(), 90);
    }

    #[test]
    fn checkpoint_fails_after_cancel() {
        let token = CancellationToken::new();
        let ctx = RunContext::new(token.clone(), Arc::new(NoopProgress));
        assert!(ctx.checkpoint().is_ok());

        token.cancel();
        assert_eq!(ctx.checkpoint(), Err(EngineError::Cancelled));
    }
}
