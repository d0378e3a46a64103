//! # Web API Application State

use std::sync::Arc;

use crate::orchestration::PublicationOrchestrator;

/// Shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<PublicationOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<PublicationOrchestrator>) -> Self {
        Self { orchestrator }
    }
}
