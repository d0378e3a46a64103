//! # Publication Intent
//!
//! The static description of a publication captured from the product catalog
//! when a run is created: the ordered image sources and the listing template.
//! The step generator works from this record plus the run's accumulated data
//! and never consults the catalog again.

use crate::providers::catalog::ProductSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    pub url: String,
}

impl ImageSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Platform-neutral listing fields. Attribute names are resolved to platform
/// identifiers by the listing policy provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingTemplate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub brand: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    pub size: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationIntent {
    #[serde(default)]
    pub images: Vec<ImageSource>,
    pub listing: ListingTemplate,
}

impl PublicationIntent {
    pub fn new(images: Vec<ImageSource>, listing: ListingTemplate) -> Self {
        Self { images, listing }
    }

    /// Capture the intent from a catalog snapshot, keeping image order
    pub fn from_product(product: &ProductSnapshot) -> Self {
        Self {
            images: product
                .image_urls
                .iter()
                .map(|url| ImageSource::new(url.clone()))
                .collect(),
            listing: ListingTemplate {
                title: product.title.clone(),
                description: product.description.clone().unwrap_or_default(),
                price_cents: product.price_cents,
                currency: product.currency.clone(),
                brand: product.brand.clone(),
                colors: product.colors.clone(),
                size: product.size.clone(),
                category: product.category.clone(),
                condition: product.condition.clone(),
            },
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Reject templates no platform could publish.
    ///
    /// Attribute mapping is the policy provider's job; this only covers
    /// fields every listing needs regardless of platform.
    pub fn validate(&self) -> Result<(), String> {
        if self.listing.title.trim().is_empty() {
            return Err("listing title is empty".to_string());
        }

        if self
            .listing
            .category
            .as_deref()
            .map_or(true, |c| c.trim().is_empty())
        {
            return Err("listing category is missing".to_string());
        }

        match self.listing.price_cents {
            None => return Err("listing price is missing".to_string()),
            Some(cents) if cents <= 0 => {
                return Err(format!("listing price must be positive, got {cents} cents"))
            }
            Some(_) => {}
        }

        if let Some(position) = self.images.iter().position(|i| i.url.trim().is_empty()) {
            return Err(format!("image source {} has an empty url", position + 1));
        }

        Ok(())
    }
}
