//! # Listing Policy Provider
//!
//! Resolves platform-neutral listing attributes into the identifiers a
//! platform expects, plus pricing and the account context to publish under.
//!
//! Resolution is synchronous and happens exactly once per creation step. An
//! attribute that is present but has no mapping is an error: publishing under
//! a guessed category is worse than not publishing.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ListingTemplate, Platform};

/// Platform-ready listing attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedListing {
    pub category_id: String,
    pub brand_id: Option<String>,
    pub color_ids: Vec<String>,
    pub size_id: Option<String>,
    pub condition_id: Option<String>,
    /// Final price after the account's pricing rule
    pub price_cents: i64,
    pub currency: String,
    pub account_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("no listing policy configured for tenant {tenant_id} on {platform}")]
    NotConfigured { tenant_id: String, platform: Platform },
    #[error("{attribute} '{value}' has no {platform} mapping")]
    UnmappedAttribute {
        attribute: &'static str,
        value: String,
        platform: Platform,
    },
    #[error("required attribute {attribute} is missing")]
    MissingAttribute { attribute: &'static str },
    #[error("price {base_cents} cents adjusted by {percent}% overflows")]
    PriceOverflow { base_cents: i64, percent: i64 },
    #[error("price {base_cents} cents adjusted by {percent}% is not positive ({adjusted_cents} cents)")]
    NonPositivePrice {
        base_cents: i64,
        percent: i64,
        adjusted_cents: i64,
    },
}

pub trait ListingPolicyProvider: Send + Sync {
    fn resolve(
        &self,
        tenant_id: &str,
        platform: Platform,
        listing: &ListingTemplate,
    ) -> Result<ResolvedListing, PolicyError>;
}

/// Mapping tables and pricing rule for one tenant account on one platform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPolicy {
    pub account_ref: Option<String>,
    /// Used when the listing template carries no currency
    pub default_currency: String,
    /// Applied to the template price, e.g. 10 adds ten percent
    #[serde(default)]
    pub price_adjustment_percent: i64,
    #[serde(default)]
    pub categories: HashMap<String, String>,
    #[serde(default)]
    pub brands: HashMap<String, String>,
    #[serde(default)]
    pub colors: HashMap<String, String>,
    #[serde(default)]
    pub sizes: HashMap<String, String>,
    #[serde(default)]
    pub conditions: HashMap<String, String>,
}

impl AccountPolicy {
    /// Apply the pricing rule. The result must stay a positive amount.
    pub fn adjusted_price(&self, base_cents: i64) -> Result<i64, PolicyError> {
        let percent = self.price_adjustment_percent;
        let adjusted = base_cents
            .checked_mul(percent)
            .map(|delta| delta / 100)
            .and_then(|delta| base_cents.checked_add(delta))
            .ok_or(PolicyError::PriceOverflow {
                base_cents,
                percent,
            })?;

        if adjusted <= 0 {
            return Err(PolicyError::NonPositivePrice {
                base_cents,
                percent,
                adjusted_cents: adjusted,
            });
        }
        Ok(adjusted)
    }

    pub fn new(default_currency: impl Into<String>) -> Self {
        Self {
            default_currency: default_currency.into(),
            ..Default::default()
        }
    }

    pub fn with_account_ref(mut self, account_ref: impl Into<String>) -> Self {
        self.account_ref = Some(account_ref.into());
        self
    }

    pub fn with_price_adjustment(mut self, percent: i64) -> Self {
        self.price_adjustment_percent = percent;
        self
    }

    pub fn map_category(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.categories.insert(name.into(), id.into());
        self
    }

    pub fn map_brand(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.brands.insert(name.into(), id.into());
        self
    }

    pub fn map_color(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.colors.insert(name.into(), id.into());
        self
    }

    pub fn map_size(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.sizes.insert(name.into(), id.into());
        self
    }

    pub fn map_condition(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.conditions.insert(name.into(), id.into());
        self
    }

    fn resolve(
        &self,
        platform: Platform,
        listing: &ListingTemplate,
    ) -> Result<ResolvedListing, PolicyError> {
        let lookup = |attribute: &'static str,
                      table: &HashMap<String, String>,
                      value: &str|
         -> Result<String, PolicyError> {
            table
                .get(value)
                .cloned()
                .ok_or_else(|| PolicyError::UnmappedAttribute {
                    attribute,
                    value: value.to_string(),
                    platform,
                })
        };

        let category = listing
            .category
            .as_deref()
            .ok_or(PolicyError::MissingAttribute {
                attribute: "category",
            })?;
        let base_price = listing.price_cents.ok_or(PolicyError::MissingAttribute {
            attribute: "price",
        })?;

        Ok(ResolvedListing {
            category_id: lookup("category", &self.categories, category)?,
            brand_id: listing
                .brand
                .as_deref()
                .map(|b| lookup("brand", &self.brands, b))
                .transpose()?,
            color_ids: listing
                .colors
                .iter()
                .map(|c| lookup("color", &self.colors, c))
                .collect::<Result<_, _>>()?,
            size_id: listing
                .size
                .as_deref()
                .map(|s| lookup("size", &self.sizes, s))
                .transpose()?,
            condition_id: listing
                .condition
                .as_deref()
                .map(|c| lookup("condition", &self.conditions, c))
                .transpose()?,
            price_cents: self.adjusted_price(base_price)?,
            currency: listing
                .currency
                .clone()
                .unwrap_or_else(|| self.default_currency.clone()),
            account_ref: self.account_ref.clone(),
        })
    }
}

/// Policy provider backed by in-process mapping tables
#[derive(Debug, Default)]
pub struct StaticPolicyProvider {
    accounts: RwLock<HashMap<(String, Platform), AccountPolicy>>,
}

impl StaticPolicyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_policy(&self, tenant_id: impl Into<String>, platform: Platform, policy: AccountPolicy) {
        self.accounts.write().insert((tenant_id.into(), platform), policy);
    }

    pub fn with_policy(
        self,
        tenant_id: impl Into<String>,
        platform: Platform,
        policy: AccountPolicy,
    ) -> Self {
        self.set_policy(tenant_id, platform, policy);
        self
    }
}

impl ListingPolicyProvider for StaticPolicyProvider {
    fn resolve(
        &self,
        tenant_id: &str,
        platform: Platform,
        listing: &ListingTemplate,
    ) -> Result<ResolvedListing, PolicyError> {
        let accounts = self.accounts.read();
        let policy = accounts
            .get(&(tenant_id.to_string(), platform))
            .ok_or_else(|| PolicyError::NotConfigured {
                tenant_id: tenant_id.to_string(),
                platform,
            })?;
        policy.resolve(platform, listing)
    }
}
