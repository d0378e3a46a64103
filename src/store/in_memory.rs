//! # In-Memory Publication Store
//!
//! Thread-safe store for tests and single-process deployments.
//!
//! Both tables sit behind one `parking_lot::RwLock`, so every commit is
//! checked and applied under a single write guard. Nothing is held across an
//! await point.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{PublicationStore, RunTransition};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::models::{Platform, PublicationRun, PublicationStep};
use crate::state_machine::RunStatus;

#[derive(Debug, Default)]
struct Tables {
    runs: HashMap<Uuid, PublicationRun>,
    steps: HashMap<Uuid, PublicationStep>,
}

impl Tables {
    fn pending_step_ids(&self, run_id: Uuid) -> Vec<Uuid> {
        self.steps
            .values()
            .filter(|s| s.run_id == run_id && s.is_pending())
            .map(|s| s.id)
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPublicationStore {
    tables: RwLock<Tables>,
}

impl InMemoryPublicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_count(&self) -> usize {
        self.tables.read().runs.len()
    }

    pub fn step_count(&self) -> usize {
        self.tables.read().steps.len()
    }

    /// Overwrite a stored step, bypassing transition checks. Lets tests age a
    /// step past the staleness window.
    pub fn replace_step(&self, step: PublicationStep) {
        self.tables.write().steps.insert(step.id, step);
    }
}

#[async_trait]
impl PublicationStore for InMemoryPublicationStore {
    async fn insert_run(
        &self,
        run: &PublicationRun,
        first_step: Option<&PublicationStep>,
    ) -> OrchestratorResult<()> {
        let mut tables = self.tables.write();

        if tables.runs.contains_key(&run.id) {
            return Err(OrchestratorError::validation(format!(
                "run {} already exists",
                run.id
            )));
        }
        if let Some(step) = first_step {
            if step.run_id != run.id {
                return Err(OrchestratorError::validation(format!(
                    "step {} does not belong to run {}",
                    step.id, run.id
                )));
            }
            tables.steps.insert(step.id, step.clone());
        }
        tables.runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn find_run(&self, run_id: Uuid) -> OrchestratorResult<Option<PublicationRun>> {
        Ok(self.tables.read().runs.get(&run_id).cloned())
    }

    async fn find_step(&self, step_id: Uuid) -> OrchestratorResult<Option<PublicationStep>> {
        Ok(self.tables.read().steps.get(&step_id).cloned())
    }

    async fn steps_for_run(&self, run_id: Uuid) -> OrchestratorResult<Vec<PublicationStep>> {
        let tables = self.tables.read();
        let mut steps: Vec<_> = tables
            .steps
            .values()
            .filter(|s| s.run_id == run_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| (s.created_at, s.id));
        Ok(steps)
    }

    async fn pending_steps_for_platform(
        &self,
        platform: Platform,
        limit: usize,
    ) -> OrchestratorResult<Vec<PublicationStep>> {
        let tables = self.tables.read();
        let mut candidates: Vec<_> = tables
            .steps
            .values()
            .filter(|s| s.platform == platform && s.is_pending())
            .filter(|s| {
                tables
                    .runs
                    .get(&s.run_id)
                    .is_some_and(|r| r.status.is_active())
            })
            .collect();
        candidates.sort_by_key(|s| (s.enqueued_at, s.id));

        let mut seen_runs = HashSet::new();
        Ok(candidates
            .into_iter()
            .filter(|s| seen_runs.insert(s.run_id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn stale_pending_steps(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> OrchestratorResult<Vec<PublicationStep>> {
        let tables = self.tables.read();
        let mut stale: Vec<_> = tables
            .steps
            .values()
            .filter(|s| s.is_pending() && s.enqueued_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by_key(|s| (s.enqueued_at, s.id));
        stale.truncate(limit);
        Ok(stale)
    }

    async fn mark_runs_processing(
        &self,
        run_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> OrchestratorResult<u64> {
        let mut tables = self.tables.write();
        let mut updated = 0;
        for run_id in run_ids {
            if let Some(run) = tables.runs.get_mut(run_id) {
                if run.status == RunStatus::Queued {
                    run.status = RunStatus::Processing;
                    run.updated_at = now;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn commit_transition(&self, transition: &RunTransition) -> OrchestratorResult<()> {
        let mut tables = self.tables.write();
        let run_id = transition.run.id;

        let stored_run = tables
            .runs
            .get(&run_id)
            .ok_or_else(|| OrchestratorError::run_not_found(run_id))?;
        if stored_run.is_terminal() {
            return Err(OrchestratorError::ConcurrentModification {
                entity: "Run",
                id: run_id,
            });
        }

        if let Some(change) = &transition.step_change {
            let stored_step = tables
                .steps
                .get(&change.step.id)
                .ok_or_else(|| OrchestratorError::step_not_found(change.step.id))?;
            if stored_step.run_id != run_id
                || stored_step.status != change.expected_status
                || stored_step.retry_count != change.expected_retry_count
            {
                return Err(OrchestratorError::ConcurrentModification {
                    entity: "Step",
                    id: change.step.id,
                });
            }
        }

        if let Some(new_step) = &transition.new_step {
            if new_step.run_id != run_id {
                return Err(OrchestratorError::validation(format!(
                    "step {} does not belong to run {run_id}",
                    new_step.id
                )));
            }
            let still_pending = tables
                .pending_step_ids(run_id)
                .into_iter()
                .filter(|id| match &transition.step_change {
                    Some(change) if change.step.id == *id => change.step.is_pending(),
                    _ => true,
                })
                .count();
            if still_pending > 0 || !new_step.is_pending() {
                return Err(OrchestratorError::SingleFlightViolation { run_id });
            }
        }

        if let Some(change) = &transition.step_change {
            tables.steps.insert(change.step.id, change.step.clone());
        }
        if let Some(new_step) = &transition.new_step {
            tables.steps.insert(new_step.id, new_step.clone());
        }
        tables.runs.insert(run_id, transition.run.clone());
        Ok(())
    }
}
