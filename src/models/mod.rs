//! # Publication Data Models
//!
//! Runs, steps and the values that flow between them.
//!
//! ## Relationships
//!
//! ```text
//! PublicationRun (1) ──► (N) PublicationStep
//!      │
//!      ├─ PublicationIntent (images + listing template)
//!      └─ Accumulator (photo_ids, listing_id, url, listing_created, ...)
//! ```

pub mod accumulator;
pub mod intent;
pub mod platform;
pub mod publication_run;
pub mod publication_step;

pub use accumulator::{Accumulator, MalformedAccumulator};
pub use intent::{ImageSource, ListingTemplate, PublicationIntent};
pub use platform::{HttpMethod, Operation, Platform};
pub use publication_run::{NewPublicationRun, PublicationRun, RunCreation, RunStatusView};
pub use publication_step::{
    CreateListingPayload, PublicationStep, StepDraft, StepKind, StepRequest, UploadImagePayload,
};
