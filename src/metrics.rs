//! # Publication Metrics
//!
//! OpenTelemetry counters for run and step lifecycle events.
//!
//! Instruments come from the global meter provider. The host process installs
//! a provider (OTLP, Prometheus, ...); until it does, every counter is a no-op.
//!
//! ```rust
//! use opentelemetry::KeyValue;
//! use publisher_core::metrics;
//!
//! metrics::runs_created_total().add(1, &[KeyValue::new("platform", "vinted")]);
//! ```

use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;
use std::sync::OnceLock;

use crate::models::Platform;

static PUBLISHER_METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    PUBLISHER_METER.get_or_init(|| opentelemetry::global::meter("publisher-orchestration"))
}

/// Platform label shared by every counter
pub fn platform_label(platform: Platform) -> KeyValue {
    KeyValue::new("platform", platform.as_str())
}

/// Runs accepted by `create_run`, including runs failed at creation
pub fn runs_created_total() -> Counter<u64> {
    meter()
        .u64_counter("publisher.runs.created.total")
        .with_description("Total number of publication runs created")
        .build()
}

pub fn runs_completed_total() -> Counter<u64> {
    meter()
        .u64_counter("publisher.runs.completed.total")
        .with_description("Total number of publication runs that created their listing")
        .build()
}

/// Labels:
/// - platform
/// - reason: generation, retries_exhausted
pub fn runs_failed_total() -> Counter<u64> {
    meter()
        .u64_counter("publisher.runs.failed.total")
        .with_description("Total number of publication runs that failed")
        .build()
}

/// Labels:
/// - platform
/// - kind: upload_image, create_listing
pub fn steps_created_total() -> Counter<u64> {
    meter()
        .u64_counter("publisher.steps.created.total")
        .with_description("Total number of steps generated")
        .build()
}

pub fn steps_retried_total() -> Counter<u64> {
    meter()
        .u64_counter("publisher.steps.retried.total")
        .with_description("Total number of steps requeued after a failure or timeout")
        .build()
}

pub fn steps_timed_out_total() -> Counter<u64> {
    meter()
        .u64_counter("publisher.steps.timed_out.total")
        .with_description("Total number of pending steps swept as stale")
        .build()
}

pub fn results_ignored_total() -> Counter<u64> {
    meter()
        .u64_counter("publisher.results.ignored.total")
        .with_description("Total number of result reports ignored as duplicates or late")
        .build()
}

/// Wall time of one staleness sweep cycle
pub fn sweep_duration() -> Histogram<f64> {
    meter()
        .f64_histogram("publisher.sweep.duration")
        .with_description("Duration of a staleness sweep cycle in milliseconds")
        .with_unit("ms")
        .build()
}
