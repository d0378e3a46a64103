//! # Run Initializer
//!
//! Creates a run from a publish request and synchronously generates its first
//! step.
//!
//! The product is read from the catalog once and frozen into the run's intent.
//! The listing is resolved against the policy before the first upload is
//! emitted. When that fails, or the generator cannot produce a first step,
//! the run is still persisted, already `failed`, so the caller can see why
//! through the status read.

use std::sync::Arc;

use chrono::Utc;
use opentelemetry::KeyValue;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::constants::{events, labels};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::executor::StepAnnouncement;
use crate::logging::{log_run_operation, log_step_operation};
use crate::metrics;
use crate::models::{
    NewPublicationRun, PublicationIntent, PublicationRun, PublicationStep, RunCreation,
};
use crate::orchestration::context::OrchestrationContext;
use crate::orchestration::step_generator::{GenerationError, NextStep};
use crate::state_machine::RunEvent;

#[derive(Debug, Clone)]
pub struct RunInitializer {
    context: Arc<OrchestrationContext>,
}

impl RunInitializer {
    pub fn new(context: Arc<OrchestrationContext>) -> Self {
        Self { context }
    }

    #[instrument(skip(self, request), fields(platform = %request.platform, subject_id = %request.subject_id))]
    pub async fn create_run(&self, request: NewPublicationRun) -> OrchestratorResult<RunCreation> {
        validate_request(&request)?;

        let product = self
            .context
            .catalog
            .fetch_product(&request.tenant_id, &request.subject_id)
            .await?
            .ok_or_else(|| {
                OrchestratorError::product_not_found(&request.tenant_id, &request.subject_id)
            })?;

        let now = Utc::now();
        let mut run = PublicationRun::new(request, PublicationIntent::from_product(&product), now);

        // Nothing is uploaded for a listing that could never be created
        let generated = self
            .context
            .generator
            .preflight(&run)
            .and_then(|()| self.context.generator.next_step(&run));
        let first_step = match generated {
            Ok(NextStep::Step(draft)) => {
                run.current_step_label = Some(draft.label.clone());
                Some(PublicationStep::from_draft(run.id, run.platform, draft, now))
            }
            Ok(NextStep::Completed) => {
                self.fail_at_creation(
                    &mut run,
                    GenerationError::NothingToPublish("intent produced no steps".to_string()),
                )?;
                None
            }
            Err(err) => {
                self.fail_at_creation(&mut run, err)?;
                None
            }
        };

        self.context
            .store
            .insert_run(&run, first_step.as_ref())
            .await?;

        metrics::runs_created_total().add(1, &[metrics::platform_label(run.platform)]);
        self.context.events.publish(
            events::RUN_CREATED,
            json!({
                "run_id": run.id,
                "platform": run.platform,
                "subject_id": run.subject_id,
                "status": run.status,
            }),
        );
        log_run_operation(
            "create_run",
            run.id,
            run.platform.as_str(),
            run.status.as_str(),
            run.error_message.as_deref(),
        );

        match &first_step {
            Some(step) => {
                self.announce_first_step(step).await;
                info!(
                    run_id = %run.id,
                    step_id = %step.id,
                    label = %step.label,
                    image_count = run.intent.image_count(),
                    "Run created with first step"
                );
            }
            None => {
                metrics::runs_failed_total().add(
                    1,
                    &[
                        metrics::platform_label(run.platform),
                        KeyValue::new("reason", "generation"),
                    ],
                );
                self.context.events.publish(
                    events::RUN_FAILED,
                    json!({ "run_id": run.id, "error_message": run.error_message }),
                );
            }
        }

        Ok(RunCreation { run, first_step })
    }

    fn fail_at_creation(
        &self,
        run: &mut PublicationRun,
        err: GenerationError,
    ) -> OrchestratorResult<()> {
        let message = err.to_string();
        warn!(run_id = %run.id, error = %message, "Step generation failed at run creation");

        run.status = self
            .context
            .run_machine
            .determine_target_state(run.status, &RunEvent::Fail(message.clone()))?;
        run.error_message = Some(message);
        run.current_step_label = Some(labels::FAILED.to_string());
        Ok(())
    }

    async fn announce_first_step(&self, step: &PublicationStep) {
        metrics::steps_created_total().add(
            1,
            &[
                metrics::platform_label(step.platform),
                KeyValue::new("kind", step.kind.name()),
            ],
        );
        self.context.events.publish(
            events::STEP_CREATED,
            json!({ "run_id": step.run_id, "step_id": step.id, "label": step.label }),
        );
        log_step_operation(
            "create_step",
            step.run_id,
            step.id,
            &step.label,
            step.status.as_str(),
            None,
        );
        self.context
            .executor_link
            .announce(StepAnnouncement::from(step))
            .await;
    }
}

fn validate_request(request: &NewPublicationRun) -> OrchestratorResult<()> {
    if request.tenant_id.trim().is_empty() {
        return Err(OrchestratorError::validation("tenant_id must not be empty"));
    }
    if request.subject_id.trim().is_empty() {
        return Err(OrchestratorError::validation("subject_id must not be empty"));
    }
    Ok(())
}
