//! Shared fixtures for the integration tests: an in-memory orchestrator wired
//! to a catalog and a policy for the `acme` tenant on every platform.

#![allow(dead_code)]

use std::sync::Arc;

use publisher_core::config::PublisherConfig;
use publisher_core::models::{NewPublicationRun, Platform, PublicationStep, StepKind};
use publisher_core::orchestration::{PublicationOrchestrator, StepReport};
use publisher_core::providers::{
    AccountPolicy, InMemoryProductCatalog, ProductSnapshot, StaticPolicyProvider,
};
use publisher_core::store::InMemoryPublicationStore;
use serde_json::{json, Value};

pub const TENANT: &str = "acme";

pub struct TestHarness {
    pub orchestrator: PublicationOrchestrator,
    pub store: Arc<InMemoryPublicationStore>,
    pub catalog: Arc<InMemoryProductCatalog>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(PublisherConfig::default())
    }

    pub fn with_config(config: PublisherConfig) -> Self {
        Self::with_policy(config, default_policy())
    }

    pub fn with_policy(config: PublisherConfig, policy: StaticPolicyProvider) -> Self {
        let store = Arc::new(InMemoryPublicationStore::new());
        let catalog = Arc::new(InMemoryProductCatalog::new());
        let orchestrator = PublicationOrchestrator::from_parts(
            &config,
            store.clone(),
            catalog.clone(),
            Arc::new(policy),
            None,
        )
        .expect("orchestrator should build from default config");

        Self {
            orchestrator,
            store,
            catalog,
        }
    }

    /// Register `product` for the test tenant and return its id
    pub fn add_product(&self, product: ProductSnapshot) -> String {
        let id = product.product_id.clone();
        self.catalog.insert(TENANT, product);
        id
    }

    pub async fn start(&self, platform: Platform, product_id: &str) -> PublicationStep {
        let creation = self
            .orchestrator
            .create_run(NewPublicationRun::publish_product(TENANT, platform, product_id))
            .await
            .expect("run creation should succeed");
        creation.first_step.expect("run should have a first step")
    }

    pub async fn pending_for_run(&self, run_id: uuid::Uuid) -> Vec<PublicationStep> {
        self.orchestrator
            .steps_for_run(run_id)
            .await
            .expect("steps should load")
            .into_iter()
            .filter(|s| s.is_pending())
            .collect()
    }
}

pub fn default_policy() -> StaticPolicyProvider {
    let base = |currency: &str| {
        AccountPolicy::new(currency)
            .map_category("jackets", "1907")
            .map_brand("Levi's", "304")
            .map_color("blue", "9")
            .map_size("M", "207")
            .map_condition("good", "3")
    };

    StaticPolicyProvider::new()
        .with_policy(TENANT, Platform::Vinted, base("EUR"))
        .with_policy(TENANT, Platform::Ebay, base("EUR"))
        .with_policy(
            TENANT,
            Platform::Etsy,
            base("USD").with_account_ref("shop-42"),
        )
}

pub fn product(product_id: &str, image_count: usize) -> ProductSnapshot {
    ProductSnapshot {
        product_id: product_id.to_string(),
        title: "Denim jacket".to_string(),
        description: Some("Barely worn".to_string()),
        price_cents: Some(2500),
        currency: None,
        brand: Some("Levi's".to_string()),
        colors: vec!["blue".to_string()],
        size: Some("M".to_string()),
        category: Some("jackets".to_string()),
        condition: Some("good".to_string()),
        image_urls: (1..=image_count)
            .map(|i| format!("https://cdn.example.com/{product_id}/{i}.jpg"))
            .collect(),
    }
}

/// The success payload an executor would report for `step`
pub fn success_for(step: &PublicationStep, id: u64) -> StepReport {
    match &step.kind {
        StepKind::UploadImage(_) => StepReport::success(json!({ "photo_id": id })),
        StepKind::CreateListing(_) => StepReport::success(json!({
            "listing_id": id,
            "url": format!("https://marketplace.example.com/items/{id}"),
        })),
    }
}

/// True when any string in `value` looks like an unresolved template
pub fn contains_placeholder(value: &Value) -> bool {
    match value {
        Value::String(s) => s.contains("{{") || s.contains("${") || s.contains("<photo"),
        Value::Array(items) => items.iter().any(contains_placeholder),
        Value::Object(fields) => fields.values().any(contains_placeholder),
        _ => false,
    }
}
