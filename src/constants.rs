//! # System Constants
//!
//! Core constants, accumulator key conventions and status groupings that
//! define the operational boundaries of the publication orchestrator.

pub use crate::state_machine::{RunStatus, StepStatus};

/// Retry ceiling applied to every step unless configured otherwise
pub const DEFAULT_MAX_RETRIES: i32 = 3;

/// A pending step with no report for this long is swept as timed out
pub const DEFAULT_STALENESS_WINDOW_SECONDS: u64 = 3600;

/// Longest accepted staleness window (one year)
pub const MAX_STALENESS_WINDOW_SECONDS: u64 = 365 * 24 * 3600;

/// How often the staleness sweeper wakes up
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

/// Upper bound on steps handed to one executor poll
pub const DEFAULT_POLL_LIMIT: usize = 50;

/// The only operation this orchestrator knows how to decompose
pub const PUBLISH_PRODUCT_OPERATION: &str = "publish_product";

/// Keys written into a run's accumulated data by the result intake
pub mod accumulator_keys {
    /// Ordered list of uploaded image identifiers
    pub const PHOTO_IDS: &str = "photo_ids";
    /// Identifier of the created listing
    pub const LISTING_ID: &str = "listing_id";
    /// Public URL of the created listing, when the platform returns one
    pub const LISTING_URL: &str = "url";
    /// Set once the creation step has succeeded
    pub const LISTING_CREATED: &str = "listing_created";
}

/// Keys the executor is expected to put in a translated result payload
pub mod result_keys {
    pub const PHOTO_ID: &str = "photo_id";
    pub const LISTING_ID: &str = "listing_id";
}

/// Step labels used for operator visibility
pub mod labels {
    pub const UPLOAD_IMAGE_PREFIX: &str = "upload_image";
    pub const CREATE_LISTING: &str = "create_listing";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";

    /// Label for the n-th (1-based) image upload
    pub fn upload_image(position: usize) -> String {
        format!("{UPLOAD_IMAGE_PREFIX}_{position}")
    }
}

/// Lifecycle events published on the orchestrator's event channel
pub mod events {
    pub const RUN_CREATED: &str = "run.created";
    pub const RUN_COMPLETED: &str = "run.completed";
    pub const RUN_FAILED: &str = "run.failed";

    pub const STEP_CREATED: &str = "step.created";
    pub const STEP_SUCCEEDED: &str = "step.succeeded";
    pub const STEP_REQUEUED: &str = "step.requeued";
    pub const STEP_FAILED: &str = "step.failed";
    pub const STEP_TIMED_OUT: &str = "step.timed_out";

    pub const RESULT_IGNORED: &str = "result.ignored";
}

/// Status groupings used by queries and guards
pub mod status_groups {
    use super::{RunStatus, StepStatus};

    /// Run statuses that indicate final completion
    pub const RUN_FINAL_STATES: &[RunStatus] = &[RunStatus::Completed, RunStatus::Failed];

    /// Run statuses for which steps may still be generated
    pub const RUN_ACTIVE_STATES: &[RunStatus] = &[RunStatus::Queued, RunStatus::Processing];

    /// Step statuses that end a step's lifecycle
    pub const STEP_FINAL_STATES: &[StepStatus] =
        &[StepStatus::Success, StepStatus::Failed, StepStatus::Timeout];
}
