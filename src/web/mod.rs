//! # Web API Module
//!
//! Axum-based REST API over the [`PublicationOrchestrator`]: run creation and
//! status for the UI, polling and result callbacks for the executor.
//!
//! ## Core Components
//!
//! - [`routes`] - route definitions
//! - [`handlers`] - request handlers per endpoint group
//! - [`state`] - shared application state
//! - [`errors`] - HTTP error mapping
//!
//! [`PublicationOrchestrator`]: crate::orchestration::PublicationOrchestrator

pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::WebConfig;
use crate::error::{OrchestratorError, OrchestratorResult};
pub use state::AppState;

/// Full application router
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .nest("/v1", routes::api_v1_routes())
        .with_state(app_state)
}

/// Bind `config.bind_address` and serve until Ctrl-C
pub async fn serve(config: &WebConfig, app_state: AppState) -> OrchestratorResult<()> {
    let listener = TcpListener::bind(&config.bind_address).await.map_err(|e| {
        OrchestratorError::ConfigurationError(format!(
            "Failed to bind {}: {e}",
            config.bind_address
        ))
    })?;
    info!(bind_address = %config.bind_address, "Web API listening");

    axum::serve(listener, create_app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| OrchestratorError::Internal(format!("Web server error: {e}")))?;

    info!("Web API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
}
