//! # Executor Handlers
//!
//! Polling and result callbacks for the external executor. Duplicate or late
//! reports are answered with 200 and an `ignored` outcome so executors can
//! retry deliveries freely.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Platform, PublicationStep};
use crate::orchestration::{ResultOutcome, StepReport};
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PendingStepsQuery {
    pub limit: Option<usize>,
}

/// Body of POST /v1/steps/:step_id/result
#[derive(Debug, Deserialize)]
pub struct ReportResultRequest {
    pub success: bool,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportResultResponse {
    pub step_id: Uuid,
    #[serde(flatten)]
    pub outcome: ResultOutcome,
}

/// Pending steps for an executor: GET /v1/executor/:platform/steps?limit=N
pub async fn pending_steps(
    State(state): State<AppState>,
    Path(platform): Path<String>,
    Query(query): Query<PendingStepsQuery>,
) -> ApiResult<Json<Vec<PublicationStep>>> {
    let platform: Platform = platform.parse().map_err(ApiError::bad_request)?;
    let steps = state
        .orchestrator
        .pending_steps(platform, query.limit)
        .await?;
    debug!(platform = %platform, count = steps.len(), "Served pending steps");
    Ok(Json(steps))
}

/// Single step: GET /v1/steps/:step_id
pub async fn get_step(
    State(state): State<AppState>,
    Path(step_id): Path<String>,
) -> ApiResult<Json<PublicationStep>> {
    let step_id = Uuid::parse_str(&step_id).map_err(|_| ApiError::invalid_uuid(step_id))?;
    Ok(Json(state.orchestrator.find_step(step_id).await?))
}

/// Executor result callback: POST /v1/steps/:step_id/result
pub async fn report_result(
    State(state): State<AppState>,
    Path(step_id): Path<String>,
    Json(body): Json<ReportResultRequest>,
) -> ApiResult<Json<ReportResultResponse>> {
    let step_id = Uuid::parse_str(&step_id).map_err(|_| ApiError::invalid_uuid(step_id))?;
    let report = StepReport::from_parts(body.success, body.result, body.error_message);

    let outcome = state.orchestrator.report_result(step_id, report).await?;
    info!(step_id = %step_id, outcome = ?outcome, "Result report applied");

    Ok(Json(ReportResultResponse { step_id, outcome }))
}
