//! # Staleness Sweeper
//!
//! Background service that times out pending steps nobody reported on.
//!
//! ## Sweep Flow
//!
//! 1. Timer tick triggers a sweep cycle
//! 2. Pending steps enqueued before `now - staleness_window` are listed
//! 3. Each one goes through the same failure path as a reported error,
//!    re-checked under its run lock
//! 4. Below the retry ceiling the step is requeued, at the ceiling it lands in
//!    `timeout` and the run fails
//!
//! A failing cycle is logged and the loop carries on. The loop ends when the
//! shutdown channel flips to `true` or its sender is dropped.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::OrchestratorResult;
use crate::metrics;
use crate::orchestration::context::OrchestrationContext;
use crate::orchestration::result_intake::{ResultIntake, ResultOutcome};

/// Counts from one sweep cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Stale pending steps found
    pub examined: usize,
    /// Steps put back to pending with one more retry used
    pub requeued: usize,
    /// Steps that exhausted their retries, failing their run
    pub failed: usize,
    /// Steps a concurrent report got to first, or that could not be processed
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct StalenessSweeper {
    context: Arc<OrchestrationContext>,
    intake: ResultIntake,
}

impl StalenessSweeper {
    pub fn new(context: Arc<OrchestrationContext>) -> Self {
        let intake = ResultIntake::new(Arc::clone(&context));
        Self { context, intake }
    }

    /// Run a single sweep against `now`
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> OrchestratorResult<SweepReport> {
        let cutoff = now - self.context.execution.staleness_window();
        let stale = self
            .context
            .store
            .stale_pending_steps(cutoff, self.context.execution.sweep_batch_size)
            .await?;

        let mut report = SweepReport {
            examined: stale.len(),
            ..SweepReport::default()
        };

        for step in stale {
            match self.intake.time_out_step(step.id, cutoff, now).await {
                Ok(ResultOutcome::Requeued { retry_count, .. }) => {
                    debug!(
                        run_id = %step.run_id,
                        step_id = %step.id,
                        label = %step.label,
                        retry_count = retry_count,
                        "Stale step requeued"
                    );
                    report.requeued += 1;
                }
                Ok(ResultOutcome::Failed { .. }) => {
                    report.failed += 1;
                }
                Ok(_) => {
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        run_id = %step.run_id,
                        step_id = %step.id,
                        error = %e,
                        "Failed to time out stale step"
                    );
                    report.skipped += 1;
                }
            }
        }

        Ok(report)
    }

    /// Sweep on the configured interval until shutdown is signalled
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut timer = interval(self.context.execution.sweep_interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_seconds = self.context.execution.sweep_interval_seconds,
            staleness_window_seconds = self.context.execution.staleness_window_seconds,
            batch_size = self.context.execution.sweep_batch_size,
            "Starting staleness sweeper"
        );

        loop {
            tokio::select! {
                _ = timer.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Staleness sweeper stopping");
                        return;
                    }
                    continue;
                }
            }

            let start = Instant::now();
            match self.sweep_once(Utc::now()).await {
                Ok(report) => {
                    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
                    metrics::sweep_duration().record(duration_ms, &[]);

                    if report.examined > 0 {
                        info!(
                            examined = report.examined,
                            requeued = report.requeued,
                            failed = report.failed,
                            skipped = report.skipped,
                            duration_ms = duration_ms,
                            "Staleness sweep completed"
                        );
                    } else {
                        debug!("No stale steps this cycle");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Staleness sweep cycle failed");
                }
            }
        }
    }

    /// Spawn [`Self::run`] onto the current runtime
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }
}
