//! # Publication Orchestration
//!
//! Turns one "publish product X on platform P" request into an ordered series
//! of remote calls performed by an external executor, one at a time.
//!
//! ## Flow
//!
//! ```text
//! create_run ──► StepGenerator ──► first step (pending)
//!                                       │
//!                     executor polls ◄──┘
//!                           │
//! report_result ──► merge result ──► StepGenerator ──► next step | completed
//!       │
//!       └─ failure ──► requeue (retry n/max) | run failed
//!
//! StalenessSweeper ──► stale pending step ──► same failure path
//! ```
//!
//! ## Components
//!
//! - [`step_generator`]: pure decision of the next step from run state
//! - [`strategies`]: per-platform request shapes
//! - [`run_initializer`]: run creation
//! - [`result_intake`]: result application and retries
//! - [`staleness_sweeper`]: timeouts for unreported steps
//! - [`run_locks`]: per-run serialization
//! - [`core`]: the [`PublicationOrchestrator`] facade

pub mod context;
pub mod core;
pub mod result_intake;
pub mod run_initializer;
pub mod run_locks;
pub mod staleness_sweeper;
pub mod step_generator;
pub mod strategies;

pub use context::OrchestrationContext;
pub use self::core::PublicationOrchestrator;
pub use result_intake::{ResultIntake, ResultOutcome, StepReport};
pub use run_initializer::RunInitializer;
pub use run_locks::{RunLockGuard, RunLocks};
pub use staleness_sweeper::{StalenessSweeper, SweepReport};
pub use step_generator::{GenerationError, NextStep, StepGenerator};
pub use strategies::{
    EbayStrategy, EtsyStrategy, PlatformStrategy, StrategyRegistry, VintedStrategy,
};
