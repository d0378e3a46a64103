//! # Result Intake
//!
//! Applies an executor's report (or a staleness timeout) to a step and drives
//! the run forward.
//!
//! ## Success path
//!
//! The step becomes `success`, its result is merged into the run's
//! accumulated data and the generator decides what follows: a new pending
//! step, run completion, or (when generation fails) run failure.
//!
//! ## Failure path
//!
//! `retry_count` goes up by one. Below the ceiling the same step returns to
//! `pending` with its payload untouched. At the ceiling the step becomes
//! `failed` (or `timeout` when swept) and the run fails with the last error.
//!
//! Everything for one run happens under that run's lock, and the resulting
//! change is committed as a single guarded transition. Reports for steps or
//! runs that are already terminal are accepted and ignored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::constants::{events, labels, result_keys};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::executor::StepAnnouncement;
use crate::logging::{log_run_operation, log_step_operation};
use crate::metrics;
use crate::models::{Accumulator, PublicationRun, PublicationStep, StepKind};
use crate::orchestration::context::OrchestrationContext;
use crate::orchestration::step_generator::NextStep;
use crate::state_machine::{RunEvent, StepEvent, StepStatus};
use crate::store::RunTransition;

/// Outcome reported by the executor for one step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepReport {
    Success { result: Value },
    Failure { error_message: String },
}

impl StepReport {
    pub fn success(result: Value) -> Self {
        Self::Success { result }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        Self::Failure {
            error_message: error_message.into(),
        }
    }

    /// Build a report from the loosely shaped `{success, result | error_message}` body
    pub fn from_parts(
        success: bool,
        result: Option<Value>,
        error_message: Option<String>,
    ) -> Self {
        if success {
            Self::Success {
                result: result.unwrap_or_else(|| json!({})),
            }
        } else {
            Self::Failure {
                error_message: error_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| "executor reported failure without a message".to_string()),
            }
        }
    }
}

/// What a report (or timeout) did to the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResultOutcome {
    /// Step succeeded and the next step was generated
    Advanced { next_step_id: Uuid, label: String },
    /// Step succeeded and the run is complete
    Completed,
    /// Step failed under the ceiling and is pending again
    Requeued { step_id: Uuid, retry_count: i32 },
    /// The run failed: retries exhausted or the next step could not be generated
    Failed { error_message: String },
    /// Nothing changed
    Ignored { reason: String },
}

impl ResultOutcome {
    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored { .. })
    }
}

/// A computed transition plus what to announce once it is committed
struct PlannedTransition {
    transition: RunTransition,
    outcome: ResultOutcome,
    /// Step that became pending, new or requeued
    pending_step: Option<PublicationStep>,
    step_event: &'static str,
}

#[derive(Debug, Clone)]
pub struct ResultIntake {
    context: Arc<OrchestrationContext>,
}

impl ResultIntake {
    pub fn new(context: Arc<OrchestrationContext>) -> Self {
        Self { context }
    }

    /// Apply an executor report to `step_id`
    #[instrument(skip(self, report), fields(step_id = %step_id))]
    pub async fn report_result(
        &self,
        step_id: Uuid,
        report: StepReport,
    ) -> OrchestratorResult<ResultOutcome> {
        let run_id = self.owning_run(step_id).await?;
        let guard = self.context.locks.acquire(run_id).await;
        let result = self.apply_report(run_id, step_id, report).await;
        drop(guard);
        self.context.locks.release_idle(run_id);
        result
    }

    /// Push a stale pending step through the failure path.
    ///
    /// The step is re-checked under the lock: if it was reported on or
    /// requeued after `cutoff`, nothing happens.
    #[instrument(skip(self), fields(step_id = %step_id))]
    pub async fn time_out_step(
        &self,
        step_id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> OrchestratorResult<ResultOutcome> {
        let run_id = self.owning_run(step_id).await?;
        let guard = self.context.locks.acquire(run_id).await;
        let result = self.apply_timeout(run_id, step_id, cutoff, now).await;
        drop(guard);
        self.context.locks.release_idle(run_id);
        result
    }

    async fn apply_report(
        &self,
        run_id: Uuid,
        step_id: Uuid,
        report: StepReport,
    ) -> OrchestratorResult<ResultOutcome> {
        let (run, step) = match self.load_active(run_id, step_id).await? {
            Ok(pair) => pair,
            Err(ignored) => return Ok(ignored),
        };

        let now = Utc::now();
        let planned = match report {
            StepReport::Success { result } => self.plan_success(run, step, result, now)?,
            StepReport::Failure { error_message } => {
                self.plan_failure(run, step, StepEvent::Fail(error_message), now)?
            }
        };
        self.commit(planned).await
    }

    async fn apply_timeout(
        &self,
        run_id: Uuid,
        step_id: Uuid,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> OrchestratorResult<ResultOutcome> {
        let (run, step) = match self.load_active(run_id, step_id).await? {
            Ok(pair) => pair,
            Err(ignored) => return Ok(ignored),
        };
        if step.enqueued_at >= cutoff {
            return Ok(ResultOutcome::ignored(
                "step was re-enqueued after the sweep began",
            ));
        }

        let message = format!(
            "step {} not reported within {}s",
            step.label, self.context.execution.staleness_window_seconds
        );
        let planned = self.plan_failure(run, step, StepEvent::TimeOut(message), now)?;
        self.commit(planned).await
    }

    async fn owning_run(&self, step_id: Uuid) -> OrchestratorResult<Uuid> {
        self.context
            .store
            .find_step(step_id)
            .await?
            .map(|step| step.run_id)
            .ok_or_else(|| OrchestratorError::step_not_found(step_id))
    }

    /// Read the run and step under the lock. `Err(outcome)` when either is
    /// already terminal.
    async fn load_active(
        &self,
        run_id: Uuid,
        step_id: Uuid,
    ) -> OrchestratorResult<Result<(PublicationRun, PublicationStep), ResultOutcome>> {
        let step = self
            .context
            .store
            .find_step(step_id)
            .await?
            .ok_or_else(|| OrchestratorError::step_not_found(step_id))?;
        let run = self
            .context
            .store
            .find_run(run_id)
            .await?
            .ok_or_else(|| OrchestratorError::run_not_found(run_id))?;

        if step.is_terminal() {
            return Ok(Err(self.ignore(&step, format!("step already {}", step.status))));
        }
        if run.is_terminal() {
            return Ok(Err(self.ignore(&step, format!("run already {}", run.status))));
        }
        Ok(Ok((run, step)))
    }

    fn ignore(&self, step: &PublicationStep, reason: String) -> ResultOutcome {
        debug!(
            run_id = %step.run_id,
            step_id = %step.id,
            reason = %reason,
            "Ignoring result report"
        );
        metrics::results_ignored_total().add(1, &[metrics::platform_label(step.platform)]);
        self.context.events.publish(
            events::RESULT_IGNORED,
            json!({ "run_id": step.run_id, "step_id": step.id, "reason": reason }),
        );
        ResultOutcome::ignored(reason)
    }

    fn plan_success(
        &self,
        mut run: PublicationRun,
        step: PublicationStep,
        result: Value,
        now: DateTime<Utc>,
    ) -> OrchestratorResult<PlannedTransition> {
        let merged = match merge_result(&run.accumulated_data, &step.kind, &result) {
            Ok(merged) => merged,
            // A result the orchestrator cannot use is an execution error
            Err(reason) => {
                return self.plan_failure(run, step, StepEvent::Fail(reason), now);
            }
        };

        let transition = self.context.step_machine.determine_transition(
            step.status,
            step.retry_count,
            &StepEvent::Succeed(result.clone()),
        )?;

        let mut succeeded = step.clone();
        succeeded.status = transition.to;
        succeeded.result = Some(result);
        succeeded.completed_at = Some(now);

        run.accumulated_data = merged;
        run.updated_at = now;

        let planned = match self.context.generator.next_step(&run) {
            Ok(NextStep::Step(draft)) => {
                run.status = self
                    .context
                    .run_machine
                    .determine_target_state(run.status, &RunEvent::StartProcessing)?;
                run.current_step_label = Some(draft.label.clone());
                let next = PublicationStep::from_draft(run.id, run.platform, draft, now);
                PlannedTransition {
                    outcome: ResultOutcome::Advanced {
                        next_step_id: next.id,
                        label: next.label.clone(),
                    },
                    transition: RunTransition::new(run)
                        .with_step_change(succeeded, &step)
                        .with_new_step(Some(next.clone())),
                    pending_step: Some(next),
                    step_event: events::STEP_SUCCEEDED,
                }
            }
            Ok(NextStep::Completed) => {
                run.status = self
                    .context
                    .run_machine
                    .determine_target_state(run.status, &RunEvent::Complete)?;
                run.current_step_label = Some(labels::COMPLETED.to_string());
                PlannedTransition {
                    outcome: ResultOutcome::Completed,
                    transition: RunTransition::new(run).with_step_change(succeeded, &step),
                    pending_step: None,
                    step_event: events::STEP_SUCCEEDED,
                }
            }
            Err(err) => {
                let message = err.to_string();
                warn!(run_id = %run.id, error = %message, "Next step could not be generated");
                run.status = self
                    .context
                    .run_machine
                    .determine_target_state(run.status, &RunEvent::Fail(message.clone()))?;
                run.error_message = Some(message.clone());
                run.current_step_label = Some(labels::FAILED.to_string());
                PlannedTransition {
                    outcome: ResultOutcome::Failed {
                        error_message: message,
                    },
                    transition: RunTransition::new(run).with_step_change(succeeded, &step),
                    pending_step: None,
                    step_event: events::STEP_SUCCEEDED,
                }
            }
        };

        Ok(planned)
    }

    fn plan_failure(
        &self,
        mut run: PublicationRun,
        step: PublicationStep,
        event: StepEvent,
        now: DateTime<Utc>,
    ) -> OrchestratorResult<PlannedTransition> {
        let transition =
            self.context
                .step_machine
                .determine_transition(step.status, step.retry_count, &event)?;
        let message = event.error_message().unwrap_or_default().to_string();

        let mut failed = step.clone();
        failed.status = transition.to;
        failed.retry_count = transition.retry_count;
        failed.last_error = Some(message.clone());
        run.updated_at = now;

        if transition.exhausted {
            failed.completed_at = Some(now);
            run.status = self
                .context
                .run_machine
                .determine_target_state(run.status, &RunEvent::Fail(message.clone()))?;
            run.error_message = Some(message.clone());
            run.current_step_label = Some(format!("{} ({})", step.label, transition.to));

            return Ok(PlannedTransition {
                outcome: ResultOutcome::Failed {
                    error_message: message,
                },
                transition: RunTransition::new(run).with_step_change(failed, &step),
                pending_step: None,
                step_event: if transition.to == StepStatus::Timeout {
                    events::STEP_TIMED_OUT
                } else {
                    events::STEP_FAILED
                },
            });
        }

        // Same id, same payload; only the bookkeeping changes
        failed.enqueued_at = now;
        run.status = self
            .context
            .run_machine
            .determine_target_state(run.status, &RunEvent::StartProcessing)?;
        run.current_step_label = Some(format!(
            "{} (retry {}/{})",
            step.label,
            transition.retry_count,
            self.context.max_retries()
        ));

        Ok(PlannedTransition {
            outcome: ResultOutcome::Requeued {
                step_id: failed.id,
                retry_count: transition.retry_count,
            },
            transition: RunTransition::new(run).with_step_change(failed.clone(), &step),
            pending_step: Some(failed),
            step_event: if matches!(event, StepEvent::TimeOut(_)) {
                events::STEP_TIMED_OUT
            } else {
                events::STEP_REQUEUED
            },
        })
    }

    async fn commit(&self, planned: PlannedTransition) -> OrchestratorResult<ResultOutcome> {
        let PlannedTransition {
            transition,
            outcome,
            pending_step,
            step_event,
        } = planned;

        match self.context.store.commit_transition(&transition).await {
            Ok(()) => {}
            Err(err) if err.is_conflict() => {
                warn!(
                    run_id = %transition.run.id,
                    error = %err,
                    "Transition lost to a concurrent writer"
                );
                metrics::results_ignored_total()
                    .add(1, &[metrics::platform_label(transition.run.platform)]);
                return Ok(ResultOutcome::ignored(err.to_string()));
            }
            Err(err) => return Err(err),
        }

        self.after_commit(&transition, &outcome, pending_step.as_ref(), step_event)
            .await;
        Ok(outcome)
    }

    async fn after_commit(
        &self,
        transition: &RunTransition,
        outcome: &ResultOutcome,
        pending_step: Option<&PublicationStep>,
        step_event: &'static str,
    ) {
        let run = &transition.run;
        let platform = metrics::platform_label(run.platform);

        if let Some(change) = &transition.step_change {
            let step = &change.step;
            self.context.events.publish(
                step_event,
                json!({
                    "run_id": run.id,
                    "step_id": step.id,
                    "label": step.label,
                    "status": step.status,
                    "retry_count": step.retry_count,
                }),
            );
            log_step_operation(
                step_event,
                run.id,
                step.id,
                &step.label,
                step.status.as_str(),
                step.last_error.as_deref(),
            );
            if step.status == StepStatus::Timeout || step_event == events::STEP_TIMED_OUT {
                metrics::steps_timed_out_total().add(1, &[platform.clone()]);
            }
        }

        match outcome {
            ResultOutcome::Advanced { .. } => {
                if let Some(next) = pending_step {
                    metrics::steps_created_total().add(
                        1,
                        &[platform.clone(), KeyValue::new("kind", next.kind.name())],
                    );
                    self.context.events.publish(
                        events::STEP_CREATED,
                        json!({ "run_id": run.id, "step_id": next.id, "label": next.label }),
                    );
                }
            }
            ResultOutcome::Requeued { retry_count, .. } => {
                metrics::steps_retried_total().add(1, &[platform.clone()]);
                info!(
                    run_id = %run.id,
                    retry_count = retry_count,
                    max_retries = self.context.max_retries(),
                    "Step requeued"
                );
            }
            ResultOutcome::Completed => {
                metrics::runs_completed_total().add(1, &[platform.clone()]);
                self.context.events.publish(
                    events::RUN_COMPLETED,
                    json!({ "run_id": run.id, "accumulated_data": run.accumulated_data }),
                );
                info!(run_id = %run.id, "Run completed");
            }
            ResultOutcome::Failed { error_message } => {
                let reason = if transition
                    .step_change
                    .as_ref()
                    .is_some_and(|c| c.step.status.is_failure())
                {
                    "retries_exhausted"
                } else {
                    "generation"
                };
                metrics::runs_failed_total()
                    .add(1, &[platform.clone(), KeyValue::new("reason", reason)]);
                self.context.events.publish(
                    events::RUN_FAILED,
                    json!({ "run_id": run.id, "error_message": error_message }),
                );
                warn!(run_id = %run.id, error = %error_message, reason = reason, "Run failed");
            }
            ResultOutcome::Ignored { .. } => {}
        }

        log_run_operation(
            "apply_result",
            run.id,
            run.platform.as_str(),
            run.status.as_str(),
            run.current_step_label.as_deref(),
        );

        if let Some(step) = pending_step {
            self.context
                .executor_link
                .announce(StepAnnouncement::from(step))
                .await;
        }
    }
}

/// Merge a success result into a copy of the accumulator.
///
/// Uploads append their `photo_id` to `photo_ids`. The creation step sets
/// each of its result keys once and then marks `listing_created`. An error
/// means the result cannot be used.
fn merge_result(
    accumulated: &Accumulator,
    kind: &StepKind,
    result: &Value,
) -> Result<Accumulator, String> {
    let mut merged = accumulated.clone();

    match kind {
        StepKind::UploadImage(upload) => {
            let photo_id = result
                .get(result_keys::PHOTO_ID)
                .filter(|v| !v.is_null())
                .cloned()
                .ok_or_else(|| {
                    format!(
                        "upload result for image {} is missing {}",
                        upload.position,
                        result_keys::PHOTO_ID
                    )
                })?;
            merged
                .append_photo_id(photo_id)
                .map_err(|e| e.to_string())?;
        }
        StepKind::CreateListing(_) => {
            let fields = result
                .as_object()
                .ok_or_else(|| "listing creation result is not an object".to_string())?;
            if fields
                .get(result_keys::LISTING_ID)
                .map_or(true, Value::is_null)
            {
                return Err(format!(
                    "listing creation result is missing {}",
                    result_keys::LISTING_ID
                ));
            }
            for (key, value) in fields {
                merged.set_once(key.clone(), value.clone());
            }
            merged.mark_listing_created();
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateListingPayload, UploadImagePayload};

    fn upload_kind() -> StepKind {
        StepKind::UploadImage(UploadImagePayload {
            image_url: "https://cdn/1.jpg".to_string(),
            position: 1,
            total: 1,
        })
    }

    fn create_kind() -> StepKind {
        StepKind::CreateListing(CreateListingPayload {
            reference: "sku-1".to_string(),
            title: "Jacket".to_string(),
            description: String::new(),
            price_cents: 1000,
            currency: "EUR".to_string(),
            photo_ids: vec![json!(101)],
            category_id: "1907".to_string(),
            brand_id: None,
            color_ids: vec![],
            size_id: None,
            condition_id: None,
            account_ref: None,
        })
    }

    #[test]
    fn test_upload_appends_photo_id() {
        let merged = merge_result(&Accumulator::new(), &upload_kind(), &json!({"photo_id": 101}))
            .unwrap();
        assert_eq!(merged.photo_ids().unwrap(), &[json!(101)]);
    }

    #[test]
    fn test_upload_without_photo_id_is_unusable() {
        assert!(merge_result(&Accumulator::new(), &upload_kind(), &json!({"id": 1})).is_err());
        assert!(
            merge_result(&Accumulator::new(), &upload_kind(), &json!({"photo_id": null})).is_err()
        );
    }

    #[test]
    fn test_creation_sets_keys_once_and_marks_created() {
        let mut acc = Accumulator::new();
        acc.append_photo_id(json!(101)).unwrap();

        let merged = merge_result(
            &acc,
            &create_kind(),
            &json!({"listing_id": 555, "url": "https://vinted/items/555", "photo_ids": "x"}),
        )
        .unwrap();

        assert_eq!(merged.get("listing_id"), Some(&json!(555)));
        assert_eq!(merged.get("url"), Some(&json!("https://vinted/items/555")));
        assert!(merged.listing_created());
        // Existing keys are never overwritten
        assert_eq!(merged.photo_ids().unwrap(), &[json!(101)]);
    }

    #[test]
    fn test_creation_without_listing_id_is_unusable() {
        assert!(merge_result(&Accumulator::new(), &create_kind(), &json!({"url": "x"})).is_err());
        assert!(merge_result(&Accumulator::new(), &create_kind(), &json!([1, 2])).is_err());
    }

    #[test]
    fn test_report_from_parts() {
        assert_eq!(
            StepReport::from_parts(true, None, None),
            StepReport::success(json!({}))
        );
        assert_eq!(
            StepReport::from_parts(false, None, Some("HTTP 503".into())),
            StepReport::failure("HTTP 503")
        );
        assert!(matches!(
            StepReport::from_parts(false, None, Some("  ".into())),
            StepReport::Failure { ref error_message } if error_message.contains("without a message")
        ));
    }

    #[test]
    fn test_outcome_wire_shape() {
        let value = serde_json::to_value(ResultOutcome::Requeued {
            step_id: Uuid::nil(),
            retry_count: 1,
        })
        .unwrap();
        assert_eq!(value["outcome"], "requeued");
        assert_eq!(value["retry_count"], 1);
    }
}
