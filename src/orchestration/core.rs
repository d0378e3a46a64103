//! # Publication Orchestrator
//!
//! The single entry point every surface (HTTP API, embedding host, tests)
//! goes through.
//!
//! ## Operations
//!
//! - `create_run`: validate, snapshot the product, persist the run with its
//!   first step
//! - `run_status` / `steps_for_run`: read views
//! - `pending_steps`: executor poll, marks the runs it touches `processing`
//! - `report_result`: executor callback
//! - `sweep_stale` / `start_sweeper`: staleness timeouts
//!
//! ## Construction
//!
//! `from_parts` wires any store; with the `postgres` feature `connect` builds
//! the pool, applies migrations and uses [`PgPublicationStore`].
//!
//! [`PgPublicationStore`]: crate::store::PgPublicationStore

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::PublisherConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::events::{EventPublisher, PublishedEvent};
use crate::executor::ExecutorLink;
use crate::models::{
    NewPublicationRun, Platform, PublicationRun, PublicationStep, RunCreation, RunStatusView,
};
use crate::orchestration::context::OrchestrationContext;
use crate::orchestration::result_intake::{ResultIntake, ResultOutcome, StepReport};
use crate::orchestration::run_initializer::RunInitializer;
use crate::orchestration::staleness_sweeper::{StalenessSweeper, SweepReport};
use crate::orchestration::step_generator::StepGenerator;
use crate::providers::{ListingPolicyProvider, ProductCatalog};
use crate::store::PublicationStore;

#[derive(Debug, Clone)]
pub struct PublicationOrchestrator {
    context: Arc<OrchestrationContext>,
    initializer: RunInitializer,
    intake: ResultIntake,
    sweeper: StalenessSweeper,
}

impl PublicationOrchestrator {
    pub fn new(context: OrchestrationContext) -> Self {
        let context = Arc::new(context);
        Self {
            initializer: RunInitializer::new(Arc::clone(&context)),
            intake: ResultIntake::new(Arc::clone(&context)),
            sweeper: StalenessSweeper::new(Arc::clone(&context)),
            context,
        }
    }

    /// Wire the orchestrator over an existing store
    pub fn from_parts(
        config: &PublisherConfig,
        store: Arc<dyn PublicationStore>,
        catalog: Arc<dyn ProductCatalog>,
        policy: Arc<dyn ListingPolicyProvider>,
        executor_link: Option<Arc<dyn ExecutorLink>>,
    ) -> OrchestratorResult<Self> {
        config.validate()?;

        let generator = StepGenerator::with_default_strategies(policy);
        let mut context =
            OrchestrationContext::new(store, catalog, generator, config.execution.clone())?
                .with_events(EventPublisher::new(config.events.channel_capacity));
        if let Some(link) = executor_link {
            context = context.with_executor_link(link);
        }

        info!(
            max_retries = config.execution.max_retries,
            staleness_window_seconds = config.execution.staleness_window_seconds,
            poll_limit = config.execution.poll_limit,
            "Publication orchestrator initialized"
        );
        Ok(Self::new(context))
    }

    /// Connect to PostgreSQL, apply migrations and wire a Pg-backed orchestrator
    #[cfg(feature = "postgres")]
    pub async fn connect(
        config: &PublisherConfig,
        catalog: Arc<dyn ProductCatalog>,
        policy: Arc<dyn ListingPolicyProvider>,
        executor_link: Option<Arc<dyn ExecutorLink>>,
    ) -> OrchestratorResult<Self> {
        let pool = crate::database::connect(&config.database).await?;
        crate::database::run_migrations(&pool).await?;
        let store = Arc::new(crate::store::PgPublicationStore::new(pool));
        Self::from_parts(config, store, catalog, policy, executor_link)
    }

    pub fn context(&self) -> &Arc<OrchestrationContext> {
        &self.context
    }

    pub async fn create_run(&self, request: NewPublicationRun) -> OrchestratorResult<RunCreation> {
        self.initializer.create_run(request).await
    }

    pub async fn find_run(&self, run_id: Uuid) -> OrchestratorResult<PublicationRun> {
        self.context
            .store
            .find_run(run_id)
            .await?
            .ok_or_else(|| OrchestratorError::run_not_found(run_id))
    }

    pub async fn run_status(&self, run_id: Uuid) -> OrchestratorResult<RunStatusView> {
        Ok(self.find_run(run_id).await?.status_view())
    }

    pub async fn steps_for_run(&self, run_id: Uuid) -> OrchestratorResult<Vec<PublicationStep>> {
        // 404 for unknown runs rather than an empty list
        self.find_run(run_id).await?;
        self.context.store.steps_for_run(run_id).await
    }

    pub async fn find_step(&self, step_id: Uuid) -> OrchestratorResult<PublicationStep> {
        self.context
            .store
            .find_step(step_id)
            .await?
            .ok_or_else(|| OrchestratorError::step_not_found(step_id))
    }

    /// Steps an executor for `platform` should perform now.
    ///
    /// At most one step per run, oldest first, capped at the configured poll
    /// limit. Runs still `queued` move to `processing`.
    #[instrument(skip(self), fields(platform = %platform))]
    pub async fn pending_steps(
        &self,
        platform: Platform,
        limit: Option<usize>,
    ) -> OrchestratorResult<Vec<PublicationStep>> {
        let cap = self.context.execution.poll_limit;
        let limit = limit.map_or(cap, |requested| requested.min(cap));
        if limit == 0 {
            return Ok(Vec::new());
        }

        let steps = self
            .context
            .store
            .pending_steps_for_platform(platform, limit)
            .await?;

        if !steps.is_empty() {
            let run_ids: Vec<Uuid> = steps.iter().map(|s| s.run_id).collect();
            let started = self
                .context
                .store
                .mark_runs_processing(&run_ids, Utc::now())
                .await?;
            debug!(
                steps = steps.len(),
                runs_started = started,
                "Handed pending steps to executor"
            );
        }

        Ok(steps)
    }

    pub async fn report_result(
        &self,
        step_id: Uuid,
        report: StepReport,
    ) -> OrchestratorResult<ResultOutcome> {
        self.intake.report_result(step_id, report).await
    }

    pub async fn sweep_stale(&self, now: DateTime<Utc>) -> OrchestratorResult<SweepReport> {
        self.sweeper.sweep_once(now).await
    }

    /// Spawn the periodic staleness sweeper
    pub fn start_sweeper(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        self.sweeper.clone().spawn(shutdown)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PublishedEvent> {
        self.context.events.subscribe()
    }
}
