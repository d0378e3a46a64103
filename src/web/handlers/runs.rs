//! # Run Handlers
//!
//! Run creation and the read views UI polling relies on.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::{
    NewPublicationRun, Operation, Platform, PublicationStep, RunStatusView,
};
use crate::state_machine::RunStatus;
use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Body of POST /v1/runs
#[derive(Debug, Deserialize)]
pub struct CreateRunRequest {
    pub tenant_id: String,
    pub platform: String,
    #[serde(default)]
    pub operation: Option<String>,
    pub subject_id: String,
}

impl CreateRunRequest {
    fn into_new_run(self) -> ApiResult<NewPublicationRun> {
        let platform: Platform = self.platform.parse().map_err(ApiError::bad_request)?;
        let operation = match self.operation.as_deref() {
            None => Operation::PublishProduct,
            Some(op) => op.parse().map_err(ApiError::bad_request)?,
        };
        Ok(NewPublicationRun {
            tenant_id: self.tenant_id,
            platform,
            operation,
            subject_id: self.subject_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CreateRunResponse {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub current_step_label: Option<String>,
    pub error_message: Option<String>,
    pub first_step: Option<PublicationStep>,
}

/// Create a publication run: POST /v1/runs
///
/// A run whose first step cannot be generated is still created, already
/// `failed`, and returned with 201 so the caller can read the reason.
pub async fn create_run(
    State(state): State<AppState>,
    Json(request): Json<CreateRunRequest>,
) -> ApiResult<(StatusCode, Json<CreateRunResponse>)> {
    let request = request.into_new_run()?;
    info!(
        tenant_id = %request.tenant_id,
        platform = %request.platform,
        subject_id = %request.subject_id,
        "Creating publication run"
    );

    let creation = state.orchestrator.create_run(request).await?;
    let response = CreateRunResponse {
        run_id: creation.run.id,
        status: creation.run.status,
        current_step_label: creation.run.current_step_label,
        error_message: creation.run.error_message,
        first_step: creation.first_step,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Run status view: GET /v1/runs/:run_id
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<RunStatusView>> {
    let run_id = Uuid::parse_str(&run_id).map_err(|_| ApiError::invalid_uuid(run_id))?;
    Ok(Json(state.orchestrator.run_status(run_id).await?))
}

/// Every step of a run, oldest first: GET /v1/runs/:run_id/steps
pub async fn list_run_steps(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<Vec<PublicationStep>>> {
    let run_id = Uuid::parse_str(&run_id).map_err(|_| ApiError::invalid_uuid(run_id))?;
    Ok(Json(state.orchestrator.steps_for_run(run_id).await?))
}
