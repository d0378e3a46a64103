//! Lifecycle event publishing for runs and steps. Event names live in
//! [`crate::constants::events`].

pub mod publisher;

pub use publisher::{EventPublisher, PublishedEvent};
