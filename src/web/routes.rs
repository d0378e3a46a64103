//! # Web API Route Definitions

use axum::routing::{get, post};
use axum::Router;

use crate::web::handlers;
use crate::web::state::AppState;

/// Routes nested under `/v1`:
/// - runs: creation, status and step history
/// - executor: polling and result callbacks
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/runs", post(handlers::runs::create_run))
        .route("/runs/:run_id", get(handlers::runs::get_run))
        .route("/runs/:run_id/steps", get(handlers::runs::list_run_steps))
        .route(
            "/executor/:platform/steps",
            get(handlers::steps::pending_steps),
        )
        .route("/steps/:step_id", get(handlers::steps::get_step))
        .route("/steps/:step_id/result", post(handlers::steps::report_result))
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::basic_health))
}
