//! # PostgreSQL Publication Store
//!
//! `sqlx` backed store for multi-instance deployments.
//!
//! Transitions run in one transaction that first takes a row lock on the run
//! (`SELECT ... FOR UPDATE`), so concurrent intakes for the same run serialize
//! across processes. The step update is conditional on the expected
//! `(status, retry_count)` and the partial unique index
//! `uq_publication_steps_one_pending_per_run` rejects a second pending step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{PublicationStore, RunTransition};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::models::{
    Accumulator, Platform, PublicationIntent, PublicationRun, PublicationStep, StepKind,
};
use crate::state_machine::{RunStatus, StepStatus};

const RUN_COLUMNS: &str = "id, tenant_id, platform, operation, subject_id, status, \
     current_step_label, intent, accumulated_data, error_message, created_at, updated_at";

const STEP_COLUMNS: &str = "id, run_id, platform, kind, label, method, path, payload, status, \
     retry_count, last_error, result, created_at, enqueued_at, completed_at";

#[derive(Debug, FromRow)]
struct RunRow {
    id: Uuid,
    tenant_id: String,
    platform: String,
    operation: String,
    subject_id: String,
    status: String,
    current_step_label: Option<String>,
    intent: Json<PublicationIntent>,
    accumulated_data: Json<Accumulator>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RunRow> for PublicationRun {
    type Error = OrchestratorError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            tenant_id: row.tenant_id,
            platform: row.platform.parse().map_err(corrupt_column)?,
            operation: row.operation.parse().map_err(corrupt_column)?,
            subject_id: row.subject_id,
            status: row.status.parse().map_err(corrupt_column)?,
            current_step_label: row.current_step_label,
            intent: row.intent.0,
            accumulated_data: row.accumulated_data.0,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct StepRow {
    id: Uuid,
    run_id: Uuid,
    platform: String,
    kind: Json<StepKind>,
    label: String,
    method: String,
    path: String,
    payload: Value,
    status: String,
    retry_count: i32,
    last_error: Option<String>,
    result: Option<Value>,
    created_at: DateTime<Utc>,
    enqueued_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<StepRow> for PublicationStep {
    type Error = OrchestratorError;

    fn try_from(row: StepRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            run_id: row.run_id,
            platform: row.platform.parse().map_err(corrupt_column)?,
            kind: row.kind.0,
            label: row.label,
            method: row.method.parse().map_err(corrupt_column)?,
            path: row.path,
            payload: row.payload,
            status: row.status.parse().map_err(corrupt_column)?,
            retry_count: row.retry_count,
            last_error: row.last_error,
            result: row.result,
            created_at: row.created_at,
            enqueued_at: row.enqueued_at,
            completed_at: row.completed_at,
        })
    }
}

fn corrupt_column(message: String) -> OrchestratorError {
    OrchestratorError::DatabaseError(format!("Unreadable column value: {message}"))
}

fn steps_from_rows(rows: Vec<StepRow>) -> OrchestratorResult<Vec<PublicationStep>> {
    rows.into_iter().map(PublicationStep::try_from).collect()
}

#[derive(Debug, Clone)]
pub struct PgPublicationStore {
    pool: PgPool,
}

impl PgPublicationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_step(
        tx: &mut Transaction<'_, Postgres>,
        step: &PublicationStep,
    ) -> OrchestratorResult<()> {
        let result = sqlx::query(
            "INSERT INTO publication_steps (id, run_id, platform, kind, label, method, path, \
             payload, status, retry_count, last_error, result, created_at, enqueued_at, \
             completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(step.id)
        .bind(step.run_id)
        .bind(step.platform.as_str())
        .bind(Json(&step.kind))
        .bind(&step.label)
        .bind(step.method.as_str())
        .bind(&step.path)
        .bind(&step.payload)
        .bind(step.status.as_str())
        .bind(step.retry_count)
        .bind(&step.last_error)
        .bind(&step.result)
        .bind(step.created_at)
        .bind(step.enqueued_at)
        .bind(step.completed_at)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(OrchestratorError::SingleFlightViolation {
                    run_id: step.run_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PublicationStore for PgPublicationStore {
    #[instrument(skip(self, run, first_step), fields(run_id = %run.id))]
    async fn insert_run(
        &self,
        run: &PublicationRun,
        first_step: Option<&PublicationStep>,
    ) -> OrchestratorResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO publication_runs (id, tenant_id, platform, operation, subject_id, \
             status, current_step_label, intent, accumulated_data, error_message, created_at, \
             updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(run.id)
        .bind(&run.tenant_id)
        .bind(run.platform.as_str())
        .bind(run.operation.as_str())
        .bind(&run.subject_id)
        .bind(run.status.as_str())
        .bind(&run.current_step_label)
        .bind(Json(&run.intent))
        .bind(Json(&run.accumulated_data))
        .bind(&run.error_message)
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(step) = first_step {
            Self::insert_step(&mut tx, step).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_run(&self, run_id: Uuid) -> OrchestratorResult<Option<PublicationRun>> {
        let row = sqlx::query_as::<_, RunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM publication_runs WHERE id = $1"
        ))
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PublicationRun::try_from).transpose()
    }

    async fn find_step(&self, step_id: Uuid) -> OrchestratorResult<Option<PublicationStep>> {
        let row = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM publication_steps WHERE id = $1"
        ))
        .bind(step_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PublicationStep::try_from).transpose()
    }

    async fn steps_for_run(&self, run_id: Uuid) -> OrchestratorResult<Vec<PublicationStep>> {
        let rows = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM publication_steps \
             WHERE run_id = $1 ORDER BY created_at, id"
        ))
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;

        steps_from_rows(rows)
    }

    async fn pending_steps_for_platform(
        &self,
        platform: Platform,
        limit: usize,
    ) -> OrchestratorResult<Vec<PublicationStep>> {
        let rows = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM ( \
                 SELECT DISTINCT ON (s.run_id) s.* \
                 FROM publication_steps s \
                 JOIN publication_runs r ON r.id = s.run_id \
                 WHERE s.platform = $1 \
                   AND s.status = 'pending' \
                   AND r.status IN ('queued', 'processing') \
                 ORDER BY s.run_id, s.enqueued_at \
             ) pending \
             ORDER BY enqueued_at, id \
             LIMIT $2"
        ))
        .bind(platform.as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        steps_from_rows(rows)
    }

    async fn stale_pending_steps(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> OrchestratorResult<Vec<PublicationStep>> {
        let rows = sqlx::query_as::<_, StepRow>(&format!(
            "SELECT {STEP_COLUMNS} FROM publication_steps \
             WHERE status = 'pending' AND enqueued_at < $1 \
             ORDER BY enqueued_at, id \
             LIMIT $2"
        ))
        .bind(cutoff)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        steps_from_rows(rows)
    }

    async fn mark_runs_processing(
        &self,
        run_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> OrchestratorResult<u64> {
        if run_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "UPDATE publication_runs SET status = 'processing', updated_at = $2 \
             WHERE id = ANY($1) AND status = 'queued'",
        )
        .bind(run_ids.to_vec())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self, transition), fields(run_id = %transition.run.id))]
    async fn commit_transition(&self, transition: &RunTransition) -> OrchestratorResult<()> {
        let run = &transition.run;
        let mut tx = self.pool.begin().await?;

        let locked_status: Option<String> =
            sqlx::query_scalar("SELECT status FROM publication_runs WHERE id = $1 FOR UPDATE")
                .bind(run.id)
                .fetch_optional(&mut *tx)
                .await?;
        let locked_status: RunStatus = locked_status
            .ok_or_else(|| OrchestratorError::run_not_found(run.id))?
            .parse()
            .map_err(corrupt_column)?;
        if locked_status.is_terminal() {
            return Err(OrchestratorError::ConcurrentModification {
                entity: "Run",
                id: run.id,
            });
        }

        if let Some(change) = &transition.step_change {
            let step = &change.step;
            let updated = sqlx::query(
                "UPDATE publication_steps \
                 SET status = $1, retry_count = $2, last_error = $3, result = $4, \
                     enqueued_at = $5, completed_at = $6 \
                 WHERE id = $7 AND run_id = $8 AND status = $9 AND retry_count = $10",
            )
            .bind(step.status.as_str())
            .bind(step.retry_count)
            .bind(&step.last_error)
            .bind(&step.result)
            .bind(step.enqueued_at)
            .bind(step.completed_at)
            .bind(step.id)
            .bind(run.id)
            .bind(change.expected_status.as_str())
            .bind(change.expected_retry_count)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                debug!(step_id = %step.id, "Step changed underneath transition");
                return Err(OrchestratorError::ConcurrentModification {
                    entity: "Step",
                    id: step.id,
                });
            }
        }

        if let Some(new_step) = &transition.new_step {
            if new_step.run_id != run.id || new_step.status != StepStatus::Pending {
                return Err(OrchestratorError::SingleFlightViolation { run_id: run.id });
            }
            Self::insert_step(&mut tx, new_step).await?;
        }

        sqlx::query(
            "UPDATE publication_runs \
             SET status = $1, current_step_label = $2, accumulated_data = $3, \
                 error_message = $4, updated_at = $5 \
             WHERE id = $6",
        )
        .bind(run.status.as_str())
        .bind(&run.current_step_label)
        .bind(Json(&run.accumulated_data))
        .bind(&run.error_message)
        .bind(run.updated_at)
        .bind(run.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
