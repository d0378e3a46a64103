//! # Collaborator Providers
//!
//! Contracts for the systems the orchestrator consumes but does not own:
//! the product catalog and the per-account listing policy (attribute mapping,
//! pricing, account context). Each contract ships with an in-process
//! implementation used by tests and single-process deployments.

pub mod catalog;
pub mod policy;

pub use catalog::{InMemoryProductCatalog, ProductCatalog, ProductSnapshot};
pub use policy::{
    AccountPolicy, ListingPolicyProvider, PolicyError, ResolvedListing, StaticPolicyProvider,
};
