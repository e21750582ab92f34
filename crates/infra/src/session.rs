//! A session owns the published results of one pipeline.
//!
//! Every stage publishes an immutable snapshot. Background jobs publish only
//! after they complete, and only if the inputs they started from are still
//! current, so readers always see a complete earlier snapshot or a complete
//! newer one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use stockroute_core::{EngineError, EoqRecord};
use stockroute_distribution::{DistributionRequest, OptimizationResult, optimize_distribution};
use stockroute_inventory::{
    RawRow, SensitivityScope, SensitivitySurface, ValidationOutcome, analyze, compute_eoq, validate,
};
use stockroute_network::{Graph, LayoutOutcome, layout};

use crate::config::EngineConfig;
use crate::jobs::{JobError, JobHandle, JobKind, spawn_job};
use crate::projections::{Report, ResultAggregator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("an optimization is already running in this session")]
    RunInProgress,

    #[error("no {0} available yet")]
    MissingStage(&'static str),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl SessionError {
    pub fn is_cancellation(&self) -> bool {
        match self {
            SessionError::Engine(e) => e.is_cancellation(),
            SessionError::Job(e) => e.is_cancellation(),
            _ => false,
        }
    }
}

/// Published state. Cloning is cheap; every stage is behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Bumped by every `load_rows`; jobs started from an older generation
    /// never publish.
    pub generation: u64,
    pub validation: Option<Arc<ValidationOutcome>>,
    pub records: Option<Arc<Vec<EoqRecord>>>,
    pub optimization: Option<Arc<OptimizationResult>>,
    pub network: Option<Arc<LayoutOutcome>>,
}

#[derive(Debug, Default)]
struct SessionState {
    snapshot: RwLock<Snapshot>,
    optimizing: AtomicBool,
}

impl SessionState {
    fn read(&self) -> RwLockReadGuard<'_, Snapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.snapshot.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_optimization(self: &Arc<Self>) -> Result<InFlight, SessionError> {
        self.optimizing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::RunInProgress)?;
        Ok(InFlight(self.clone()))
    }

    /// Returns whether the result was published.
    fn publish_optimization(&self, generation: u64, result: Arc<OptimizationResult>) -> bool {
        let mut snapshot = self.write();
        if snapshot.generation != generation {
            return false;
        }
        snapshot.optimization = Some(result);
        snapshot.network = None;
        true
    }

    fn publish_network(&self, source: &Arc<OptimizationResult>, outcome: Arc<LayoutOutcome>) -> bool {
        let mut snapshot = self.write();
        match &snapshot.optimization {
            Some(current) if Arc::ptr_eq(current, source) => {
                snapshot.network = Some(outcome);
                true
            }
            _ => false,
        }
    }
}

/// Marks an optimization as in flight until dropped.
#[derive(Debug)]
struct InFlight(Arc<SessionState>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.optimizing.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    config: EngineConfig,
    state: Arc<SessionState>,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        let id = SessionId::new();
        debug!(session_id = %id, "session created");
        Self {
            id,
            config,
            state: Arc::default(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.read().clone()
    }

    pub fn is_optimizing(&self) -> bool {
        self.state.optimizing.load(Ordering::Acquire)
    }

    /// Validate `rows`, compute EOQ for the accepted records and publish
    /// both, replacing the previous input and discarding every later stage.
    pub fn load_rows(&self, rows: &[RawRow]) -> Result<Arc<ValidationOutcome>, SessionError> {
        let outcome = validate(rows);
        let records = compute_eoq(&outcome.records)?;
        let outcome = Arc::new(outcome);

        let mut snapshot = self.state.write();
        let generation = snapshot.generation + 1;
        *snapshot = Snapshot {
            generation,
            validation: Some(outcome.clone()),
            records: Some(Arc::new(records)),
            optimization: None,
            network: None,
        };
        info!(
            session_id = %self.id,
            generation = snapshot.generation,
            accepted = outcome.records.len(),
            rejected = outcome.rejections.len(),
            "rows loaded"
        );
        Ok(outcome)
    }

    pub fn validation(&self) -> Option<Arc<ValidationOutcome>> {
        self.state.read().validation.clone()
    }

    pub fn records(&self) -> Result<Arc<Vec<EoqRecord>>, SessionError> {
        self.state.read().records.clone().ok_or(SessionError::MissingStage("records"))
    }

    pub fn optimization(&self) -> Option<Arc<OptimizationResult>> {
        self.state.read().optimization.clone()
    }

    pub fn network(&self) -> Option<Arc<LayoutOutcome>> {
        self.state.read().network.clone()
    }

    /// Sweep the configured sensitivity grid over the current records.
    pub fn sensitivity(&self, scope: SensitivityScope) -> Result<Vec<SensitivitySurface>, SessionError> {
        let records = self.records()?;
        Ok(analyze(&records, scope, &self.config.sensitivity)?)
    }

    /// Solve the distribution problem for the current records in the
    /// background. At most one optimization runs per session.
    pub fn start_optimization(
        &self,
        request: DistributionRequest,
    ) -> Result<JobHandle<Arc<OptimizationResult>>, SessionError> {
        let (generation, records) = {
            let snapshot = self.state.read();
            let records = snapshot.records.clone().ok_or(SessionError::MissingStage("records"))?;
            (snapshot.generation, records)
        };
        let in_flight = self.state.begin_optimization()?;

        let state = self.state.clone();
        let solver = self.config.solver.clone();
        let session_id = self.id;
        let handle = spawn_job(JobKind::Optimization, move |ctx| {
            let _in_flight = in_flight;
            let result = Arc::new(optimize_distribution(&records, &request, &solver, ctx)?);
            if state.publish_optimization(generation, result.clone()) {
                info!(
                    session_id = %session_id,
                    generation,
                    total_cost = result.total_cost,
                    pivots = result.pivots,
                    "optimization published"
                );
            } else {
                info!(session_id = %session_id, generation, "stale optimization discarded");
            }
            Ok(result)
        })?;
        Ok(handle)
    }

    /// Lay out the network of the current optimization in the background.
    pub fn start_layout(&self) -> Result<JobHandle<Arc<LayoutOutcome>>, SessionError> {
        let (records, optimization) = {
            let snapshot = self.state.read();
            let records = snapshot.records.clone().ok_or(SessionError::MissingStage("records"))?;
            let optimization = snapshot
                .optimization
                .clone()
                .ok_or(SessionError::MissingStage("optimization"))?;
            (records, optimization)
        };

        let config = self.config.layout.clone();
        let graph = Graph::from_assignment(&optimization.assignment, &records, &config.canvas);
        let state = self.state.clone();
        let session_id = self.id;
        let handle = spawn_job(JobKind::Layout, move |ctx| {
            let outcome = Arc::new(layout(&graph, &config, ctx)?);
            if state.publish_network(&optimization, outcome.clone()) {
                info!(
                    session_id = %session_id,
                    steps = outcome.steps,
                    converged = outcome.converged,
                    "layout published"
                );
            } else {
                info!(session_id = %session_id, "stale layout discarded");
            }
            Ok(outcome)
        })?;
        Ok(handle)
    }

    /// Cross-checked report of the current snapshot. The network section is
    /// included once a layout has been published.
    pub fn aggregate(&self) -> Result<Report, SessionError> {
        let snapshot = self.snapshot();
        let records = snapshot.records.ok_or(SessionError::MissingStage("records"))?;
        let optimization = snapshot
            .optimization
            .ok_or(SessionError::MissingStage("optimization"))?;
        Ok(ResultAggregator::default().aggregate(
            &optimization,
            &records,
            snapshot.network.as_deref(),
        )?)
    }
}
