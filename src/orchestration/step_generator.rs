//! # Step Generator
//!
//! Pure decision function mapping a run's accumulated state to its next step
//! or to completion.
//!
//! ## Protocol
//!
//! 1. One upload step per image source, strictly in intent order. The number
//!    of accumulated `photo_ids` says how many have succeeded; the next upload
//!    carries only the next unprocessed source.
//! 2. Once every image is uploaded and `listing_created` is absent, a single
//!    creation step whose payload inlines every accumulated photo id together
//!    with the listing fields resolved by the policy provider.
//! 3. Otherwise the run is complete.
//!
//! The generator holds no counters of its own: the same run record always
//! yields the same step description. Accumulated keys it does not recognise
//! are ignored.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::constants::labels;
use crate::models::{
    CreateListingPayload, Platform, PublicationRun, StepDraft, StepKind, UploadImagePayload,
};
use crate::orchestration::strategies::StrategyRegistry;
use crate::providers::{ListingPolicyProvider, PolicyError};

/// Errors that make a run unpublishable. Always fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("malformed publication intent: {0}")]
    MalformedIntent(String),
    #[error("cannot resolve {attribute}: {reason}")]
    UnresolvedAttribute { attribute: String, reason: String },
    #[error("listing policy unavailable: {0}")]
    PolicyUnavailable(String),
    #[error("no step strategy registered for platform {0}")]
    PlatformUnsupported(Platform),
    #[error("accumulated data is corrupt: {0}")]
    CorruptAccumulator(String),
    #[error("nothing to publish: {0}")]
    NothingToPublish(String),
}

impl From<PolicyError> for GenerationError {
    fn from(err: PolicyError) -> Self {
        let reason = err.to_string();
        match err {
            PolicyError::NotConfigured { .. } => Self::PolicyUnavailable(reason),
            PolicyError::UnmappedAttribute { attribute, .. }
            | PolicyError::MissingAttribute { attribute } => Self::UnresolvedAttribute {
                attribute: attribute.to_string(),
                reason,
            },
            PolicyError::PriceOverflow { .. } | PolicyError::NonPositivePrice { .. } => {
                Self::UnresolvedAttribute {
                    attribute: "price".to_string(),
                    reason,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    Step(StepDraft),
    Completed,
}

impl NextStep {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn into_draft(self) -> Option<StepDraft> {
        match self {
            Self::Step(draft) => Some(draft),
            Self::Completed => None,
        }
    }
}

/// Upload-then-create step generator
#[derive(Clone)]
pub struct StepGenerator {
    policy: Arc<dyn ListingPolicyProvider>,
    strategies: StrategyRegistry,
}

impl std::fmt::Debug for StepGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepGenerator")
            .field("platforms", &self.strategies.platforms())
            .finish()
    }
}

impl StepGenerator {
    pub fn new(policy: Arc<dyn ListingPolicyProvider>, strategies: StrategyRegistry) -> Self {
        Self { policy, strategies }
    }

    /// Generator using the built-in platform strategies
    pub fn with_default_strategies(policy: Arc<dyn ListingPolicyProvider>) -> Self {
        Self::new(policy, StrategyRegistry::with_defaults())
    }

    /// Check that the run's listing can be published before anything is
    /// uploaded: the intent is well formed, the platform has a strategy and
    /// the policy resolves every attribute and the price.
    ///
    /// The creation step resolves the listing again when it is generated, so
    /// the policy in force at that point is the one published.
    pub fn preflight(&self, run: &PublicationRun) -> Result<(), GenerationError> {
        run.intent
            .validate()
            .map_err(GenerationError::MalformedIntent)?;
        self.strategies.get(run.platform)?;
        self.policy
            .resolve(&run.tenant_id, run.platform, &run.intent.listing)?;
        Ok(())
    }

    /// Decide the run's next step from its intent and accumulated data
    pub fn next_step(&self, run: &PublicationRun) -> Result<NextStep, GenerationError> {
        run.intent
            .validate()
            .map_err(GenerationError::MalformedIntent)?;

        let strategy = self.strategies.get(run.platform)?;
        let accumulated = &run.accumulated_data;
        let photo_ids = accumulated
            .photo_ids()
            .map_err(|e| GenerationError::CorruptAccumulator(e.to_string()))?;

        let required = run.intent.image_count();
        let done = photo_ids.len();

        if done < required {
            let position = done + 1;
            let upload = UploadImagePayload {
                image_url: run.intent.images[done].url.clone(),
                position,
                total: required,
            };
            debug!(
                run_id = %run.id,
                platform = %run.platform,
                position = position,
                total = required,
                "Generating image upload step"
            );
            return Ok(NextStep::Step(StepDraft {
                request: strategy.upload_image_request(&upload),
                label: labels::upload_image(position),
                kind: StepKind::UploadImage(upload),
            }));
        }

        if accumulated.listing_created() {
            return Ok(NextStep::Completed);
        }

        let resolved = self
            .policy
            .resolve(&run.tenant_id, run.platform, &run.intent.listing)?;

        let listing = CreateListingPayload {
            reference: run.subject_id.clone(),
            title: run.intent.listing.title.clone(),
            description: run.intent.listing.description.clone(),
            price_cents: resolved.price_cents,
            currency: resolved.currency,
            photo_ids: photo_ids.to_vec(),
            category_id: resolved.category_id,
            brand_id: resolved.brand_id,
            color_ids: resolved.color_ids,
            size_id: resolved.size_id,
            condition_id: resolved.condition_id,
            account_ref: resolved.account_ref,
        };

        debug!(
            run_id = %run.id,
            platform = %run.platform,
            photo_count = listing.photo_ids.len(),
            "Generating listing creation step"
        );

        Ok(NextStep::Step(StepDraft {
            request: strategy.create_listing_request(&listing)?,
            label: labels::CREATE_LISTING.to_string(),
            kind: StepKind::CreateListing(listing),
        }))
    }
}
