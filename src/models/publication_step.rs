//! # Publication Step
//!
//! One durable description of a single outbound call belonging to a run.
//!
//! Each step carries both a strongly typed [`StepKind`] (what the call is for)
//! and the generic wire record (`method`, `path`, `payload`) the executor
//! performs verbatim. The wire record is fully resolved when the step is
//! generated and is never rewritten afterwards; a requeued step is redelivered
//! with the identical payload.

use super::platform::{HttpMethod, Platform};
use crate::state_machine::StepStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Upload of one image source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadImagePayload {
    pub image_url: String,
    /// 1-based position of the image in the intent
    pub position: usize,
    pub total: usize,
}

/// Creation of the listing once every image is uploaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateListingPayload {
    /// Caller-side reference of the listing, the product id
    pub reference: String,
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    pub currency: String,
    /// Every accumulated image identifier, in upload order
    pub photo_ids: Vec<Value>,
    pub category_id: String,
    pub brand_id: Option<String>,
    pub color_ids: Vec<String>,
    pub size_id: Option<String>,
    pub condition_id: Option<String>,
    /// Platform account context (shop id, seller handle)
    pub account_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum StepKind {
    UploadImage(UploadImagePayload),
    CreateListing(CreateListingPayload),
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UploadImage(_) => "upload_image",
            Self::CreateListing(_) => "create_listing",
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, Self::UploadImage(_))
    }

    pub fn is_create_listing(&self) -> bool {
        matches!(self, Self::CreateListing(_))
    }
}

/// The literal call the executor performs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRequest {
    pub method: HttpMethod,
    /// Relative to the platform's base URL
    pub path: String,
    pub payload: Value,
}

/// A step as emitted by the generator, before it is bound to a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDraft {
    pub kind: StepKind,
    pub label: String,
    pub request: StepRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationStep {
    pub id: Uuid,
    pub run_id: Uuid,
    pub platform: Platform,
    pub kind: StepKind,
    pub label: String,
    pub method: HttpMethod,
    pub path: String,
    pub payload: Value,
    pub status: StepStatus,
    pub retry_count: i32,
    pub last_error: Option<String>,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    /// When the step last became pending (creation or requeue)
    pub enqueued_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PublicationStep {
    /// Bind a generated draft to its run as a fresh pending step
    pub fn from_draft(
        run_id: Uuid,
        platform: Platform,
        draft: StepDraft,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id,
            platform,
            kind: draft.kind,
            label: draft.label,
            method: draft.request.method,
            path: draft.request.path,
            payload: draft.request.payload,
            status: StepStatus::Pending,
            retry_count: 0,
            last_error: None,
            result: None,
            created_at: now,
            enqueued_at: now,
            completed_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn request(&self) -> StepRequest {
        StepRequest {
            method: self.method,
            path: self.path.clone(),
            payload: self.payload.clone(),
        }
    }
}
