//! # Publisher Configuration Validator
//!
//! Loads the layered publisher configuration (defaults, TOML files,
//! `PUBLISHER__*` environment variables) exactly as the orchestrator would and
//! prints the effective, secret-masked result.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use publisher_core::config::ConfigLoader;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate publisher configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long)]
    environment: Option<String>,

    /// Configuration directory (default: $PUBLISHER_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the effective configuration as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigLoader::detect_environment);
    let config_dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(ConfigLoader::default_config_directory);

    println!("Validating publisher configuration");
    println!("Environment: {environment}");
    println!("Config Directory: {}", config_dir.display());
    println!();

    let config = match ConfigLoader::load_from_directory_with_env(&config_dir, &environment) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            println!("❌ {e}");
            process::exit(1);
        }
    };

    println!("✅ Configuration loaded and validated");
    let sanitized = config.sanitized();
    if cli.json {
        match serde_json::to_string_pretty(&sanitized) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                println!("❌ Failed to render configuration: {e}");
                process::exit(1);
            }
        }
    } else {
        println!("  database.url: {}", sanitized["database"]["url"]);
        println!(
            "  database.max_connections: {}",
            config.database.max_connections
        );
        println!("  execution.max_retries: {}", config.execution.max_retries);
        println!(
            "  execution.staleness_window_seconds: {}",
            config.execution.staleness_window_seconds
        );
        println!(
            "  execution.sweep_interval_seconds: {}",
            config.execution.sweep_interval_seconds
        );
        println!("  execution.poll_limit: {}", config.execution.poll_limit);
        println!(
            "  web: enabled={} bind_address={}",
            config.web.enabled, config.web.bind_address
        );
        println!("  events.channel_capacity: {}", config.events.channel_capacity);
    }
}
