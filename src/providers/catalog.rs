//! # Product Catalog
//!
//! Read-only view of the product CRUD owned by the surrounding application.
//! The orchestrator reads a product once, when a run is created, and freezes
//! it into the run's [`PublicationIntent`](crate::models::PublicationIntent).

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::OrchestratorResult;

/// Product fields the publication needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub brand: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    pub size: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    /// Image URLs in display order
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// `Ok(None)` when the tenant has no such product
    async fn fetch_product(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> OrchestratorResult<Option<ProductSnapshot>>;
}

/// In-memory catalog for tests and single-process deployments
#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    products: RwLock<HashMap<(String, String), ProductSnapshot>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant_id: impl Into<String>, product: ProductSnapshot) {
        let key = (tenant_id.into(), product.product_id.clone());
        self.products.write().insert(key, product);
    }

    pub fn len(&self) -> usize {
        self.products.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.read().is_empty()
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn fetch_product(
        &self,
        tenant_id: &str,
        product_id: &str,
    ) -> OrchestratorResult<Option<ProductSnapshot>> {
        let key = (tenant_id.to_string(), product_id.to_string());
        Ok(self.products.read().get(&key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_products_are_scoped_by_tenant() {
        let catalog = InMemoryProductCatalog::new();
        catalog.insert(
            "acme",
            ProductSnapshot {
                product_id: "sku-1".to_string(),
                title: "Jacket".to_string(),
                ..Default::default()
            },
        );

        assert!(catalog.fetch_product("acme", "sku-1").await.unwrap().is_some());
        assert!(catalog.fetch_product("globex", "sku-1").await.unwrap().is_none());
        assert_eq!(catalog.len(), 1);
    }
}
