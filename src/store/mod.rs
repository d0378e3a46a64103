//! # Publication Store
//!
//! Durable state for runs and steps.
//!
//! The store is where the single-flight guarantee is enforced: a run never
//! has more than one `pending` step, whichever orchestrator instance commits
//! the transition. Every state change computed by the orchestration layer is
//! handed over as one [`RunTransition`] and committed atomically, guarded by
//! the state it was computed from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::OrchestratorResult;
use crate::models::{Platform, PublicationRun, PublicationStep};
use crate::state_machine::StepStatus;

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryPublicationStore;
#[cfg(feature = "postgres")]
pub use postgres::PgPublicationStore;

/// Replacement for an existing step, guarded by the state it was read in
#[derive(Debug, Clone, PartialEq)]
pub struct StepChange {
    pub step: PublicationStep,
    pub expected_status: StepStatus,
    pub expected_retry_count: i32,
}

/// One atomic change to a run and its steps.
///
/// `run` is the run's full new state. The commit fails with
/// `ConcurrentModification` when the stored run is already terminal or the
/// stored step no longer matches its expectation, and with
/// `SingleFlightViolation` when `new_step` would leave the run with two
/// pending steps.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTransition {
    pub run: PublicationRun,
    pub step_change: Option<StepChange>,
    pub new_step: Option<PublicationStep>,
}

impl RunTransition {
    pub fn new(run: PublicationRun) -> Self {
        Self {
            run,
            step_change: None,
            new_step: None,
        }
    }

    pub fn with_step_change(mut self, step: PublicationStep, expected: &PublicationStep) -> Self {
        self.step_change = Some(StepChange {
            step,
            expected_status: expected.status,
            expected_retry_count: expected.retry_count,
        });
        self
    }

    pub fn with_new_step(mut self, step: Option<PublicationStep>) -> Self {
        self.new_step = step;
        self
    }
}

#[async_trait]
pub trait PublicationStore: Send + Sync {
    /// Persist a new run and, when generation produced one, its first step
    async fn insert_run(
        &self,
        run: &PublicationRun,
        first_step: Option<&PublicationStep>,
    ) -> OrchestratorResult<()>;

    async fn find_run(&self, run_id: Uuid) -> OrchestratorResult<Option<PublicationRun>>;

    async fn find_step(&self, step_id: Uuid) -> OrchestratorResult<Option<PublicationStep>>;

    /// Every step of a run, oldest first
    async fn steps_for_run(&self, run_id: Uuid) -> OrchestratorResult<Vec<PublicationStep>>;

    /// Pending steps of active runs on `platform`, at most one per run,
    /// longest-waiting first
    async fn pending_steps_for_platform(
        &self,
        platform: Platform,
        limit: usize,
    ) -> OrchestratorResult<Vec<PublicationStep>>;

    /// Pending steps enqueued before `cutoff`
    async fn stale_pending_steps(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> OrchestratorResult<Vec<PublicationStep>>;

    /// Move still-`queued` runs to `processing`. Returns how many changed.
    async fn mark_runs_processing(
        &self,
        run_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> OrchestratorResult<u64>;

    async fn commit_transition(&self, transition: &RunTransition) -> OrchestratorResult<()>;
}
