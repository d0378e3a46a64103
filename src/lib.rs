#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Publisher Core
//!
//! Step-by-step orchestration of marketplace listing publication.
//!
//! ## Overview
//!
//! Publishing a product to a marketplace is a sequence of dependent remote
//! calls: upload each image, then create the listing with the returned photo
//! identifiers. The calls themselves are performed by an external executor
//! (typically a browser extension or proxy holding the marketplace session).
//! This crate decides *what* to call next, records what came back, retries
//! failures up to a ceiling and times out steps nobody reports on.
//!
//! ## Architecture
//!
//! - A **run** is one "publish product P on platform X" instance. It owns an
//!   accumulator of results and a status.
//! - A **step** is one remote call description. A run has at most one
//!   pending step at a time.
//! - The **step generator** is a pure function from run state to the next
//!   step, with per-platform request shapes supplied by strategies.
//!
//! ## Module Organization
//!
//! - [`models`] - runs, steps, intents and the accumulator
//! - [`state_machine`] - run and step transition tables
//! - [`orchestration`] - generator, run creation, result intake, sweeper
//! - [`store`] - persistence contract with in-memory and PostgreSQL backends
//! - [`providers`] - product catalog and listing policy contracts
//! - [`executor`] - push notifications toward the executor
//! - [`web`] - HTTP API
//! - [`config`] - layered configuration
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use publisher_core::config::PublisherConfig;
//! use publisher_core::models::{NewPublicationRun, Platform};
//! use publisher_core::orchestration::PublicationOrchestrator;
//! use publisher_core::providers::{InMemoryProductCatalog, StaticPolicyProvider};
//! use publisher_core::store::InMemoryPublicationStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = PublicationOrchestrator::from_parts(
//!     &PublisherConfig::default(),
//!     Arc::new(InMemoryPublicationStore::new()),
//!     Arc::new(InMemoryProductCatalog::new()),
//!     Arc::new(StaticPolicyProvider::new()),
//!     None,
//! )?;
//!
//! let creation = orchestrator
//!     .create_run(NewPublicationRun::publish_product("acme", Platform::Vinted, "sku-1"))
//!     .await?;
//! println!("run {} is {}", creation.run.id, creation.run.status);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
#[cfg(feature = "postgres")]
pub mod database;
pub mod error;
pub mod events;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod orchestration;
pub mod providers;
pub mod state_machine;
pub mod store;
pub mod web;

pub use config::{ConfigLoader, PublisherConfig};
pub use error::{OrchestratorError, OrchestratorResult};
pub use models::{
    NewPublicationRun, Platform, PublicationRun, PublicationStep, RunCreation, RunStatusView,
};
pub use orchestration::{PublicationOrchestrator, ResultOutcome, StepReport};
pub use state_machine::{RunStatus, StepStatus};
