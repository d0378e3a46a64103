//! # Platform Step Strategies
//!
//! Thin per-platform builders that turn a typed step payload into the literal
//! HTTP call the executor performs. They decide paths and body shapes only;
//! sequencing belongs to the [`StepGenerator`](super::step_generator::StepGenerator).

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::models::{CreateListingPayload, Platform, StepRequest, UploadImagePayload};
use crate::orchestration::step_generator::GenerationError;

pub mod ebay;
pub mod etsy;
pub mod vinted;

pub use ebay::EbayStrategy;
pub use etsy::EtsyStrategy;
pub use vinted::VintedStrategy;

pub trait PlatformStrategy: Send + Sync + Debug {
    fn platform(&self) -> Platform;

    fn upload_image_request(&self, upload: &UploadImagePayload) -> StepRequest;

    /// Fails when the platform needs an attribute the resolved listing lacks
    fn create_listing_request(
        &self,
        listing: &CreateListingPayload,
    ) -> Result<StepRequest, GenerationError>;
}

#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<Platform, Arc<dyn PlatformStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Vinted, eBay and Etsy strategies
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(VintedStrategy));
        registry.register(Arc::new(EbayStrategy));
        registry.register(Arc::new(EtsyStrategy));
        registry
    }

    /// Replaces any strategy already registered for the same platform
    pub fn register(&mut self, strategy: Arc<dyn PlatformStrategy>) {
        self.strategies.insert(strategy.platform(), strategy);
    }

    pub fn get(&self, platform: Platform) -> Result<&dyn PlatformStrategy, GenerationError> {
        self.strategies
            .get(&platform)
            .map(|s| s.as_ref())
            .ok_or(GenerationError::PlatformUnsupported(platform))
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<_> = self.strategies.keys().copied().collect();
        platforms.sort();
        platforms
    }
}

/// Minor units as a two-decimal string, `1250` -> `"12.50"`
pub(crate) fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1250), "12.50");
        assert_eq!(format_price(5), "0.05");
        assert_eq!(format_price(100_000), "1000.00");
        assert_eq!(format_price(-150), "-1.50");
    }

    #[test]
    fn test_defaults_cover_every_platform() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.platforms(), Platform::ALL.to_vec());
        for platform in Platform::ALL {
            assert_eq!(registry.get(platform).unwrap().platform(), platform);
        }
    }

    #[test]
    fn test_empty_registry_reports_unsupported_platform() {
        let registry = StrategyRegistry::new();
        assert_eq!(
            registry.get(Platform::Etsy).unwrap_err(),
            GenerationError::PlatformUnsupported(Platform::Etsy)
        );
    }
}
