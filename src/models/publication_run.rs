//! # Publication Run
//!
//! One durable orchestration instance: "publish product P to platform X".
//!
//! The run owns its accumulated data and its steps. Only the result intake,
//! the staleness sweeper and run creation mutate it, always under the run's
//! lock.

use super::accumulator::Accumulator;
use super::intent::PublicationIntent;
use super::platform::{Operation, Platform};
use super::publication_step::PublicationStep;
use crate::state_machine::RunStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationRun {
    pub id: Uuid,
    pub tenant_id: String,
    pub platform: Platform,
    pub operation: Operation,
    pub subject_id: String,
    pub status: RunStatus,
    /// Progress marker for operators, not authoritative state
    pub current_step_label: Option<String>,
    pub intent: PublicationIntent,
    pub accumulated_data: Accumulator,
    /// Only set when `status` is `failed`
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to start a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPublicationRun {
    pub tenant_id: String,
    pub platform: Platform,
    pub operation: Operation,
    pub subject_id: String,
}

impl NewPublicationRun {
    pub fn publish_product(
        tenant_id: impl Into<String>,
        platform: Platform,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            platform,
            operation: Operation::PublishProduct,
            subject_id: subject_id.into(),
        }
    }
}

impl PublicationRun {
    pub fn new(request: NewPublicationRun, intent: PublicationIntent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id: request.tenant_id,
            platform: request.platform,
            operation: request.operation,
            subject_id: request.subject_id,
            status: RunStatus::Queued,
            current_step_label: None,
            intent,
            accumulated_data: Accumulator::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn status_view(&self) -> RunStatusView {
        RunStatusView {
            run_id: self.id,
            platform: self.platform,
            subject_id: self.subject_id.clone(),
            status: self.status,
            current_step_label: self.current_step_label.clone(),
            accumulated_data: self.accumulated_data.clone(),
            error_message: self.error_message.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// What UI polling sees of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatusView {
    pub run_id: Uuid,
    pub platform: Platform,
    pub subject_id: String,
    pub status: RunStatus,
    pub current_step_label: Option<String>,
    pub accumulated_data: Accumulator,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Result of creating a run: the run itself and its first step, if one was
/// generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunCreation {
    pub run: PublicationRun,
    pub first_step: Option<PublicationStep>,
}
