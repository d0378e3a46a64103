//! # Tracing Module
//!
//! Environment-aware console logging for the publication orchestrator.
//!
//! - `RUST_LOG` wins when set; otherwise the level follows `PUBLISHER_ENV`
//! - JSON lines in production, human-readable output elsewhere
//! - ANSI colors only when stdout is a terminal
//! - Safe to call more than once, and safe when the host already installed a
//!   global subscriber

use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use uuid::Uuid;

use crate::config::loader::ConfigLoader;

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console logging
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = ConfigLoader::detect_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_log_level(&environment)));
        let use_ansi = std::io::stdout().is_terminal();

        let console_layer = if environment == "production" {
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(use_ansi)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }

        tracing::info!(environment = %environment, ansi = use_ansi, "Tracing initialized");
    });
}

fn default_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        "test" => "warn",
        _ => "debug",
    }
}

/// Log structured data for run operations
pub fn log_run_operation(
    operation: &str,
    run_id: Uuid,
    platform: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        run_id = %run_id,
        platform = %platform,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "RUN_OPERATION"
    );
}

/// Log structured data for step operations
pub fn log_step_operation(
    operation: &str,
    run_id: Uuid,
    step_id: Uuid,
    label: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        run_id = %run_id,
        step_id = %step_id,
        label = %label,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "STEP_OPERATION"
    );
}
