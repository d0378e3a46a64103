//! Configuration Loader
//!
//! Environment-aware loading built on the `config` crate: defaults, then the
//! base TOML file, then the environment overlay, then `PUBLISHER__*` variables.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::ConfigResult;
use super::PublisherConfig;

pub const ENVIRONMENT_VARIABLE: &str = "PUBLISHER_ENV";
pub const CONFIG_DIR_VARIABLE: &str = "PUBLISHER_CONFIG_DIR";
pub const ENV_PREFIX: &str = "PUBLISHER";
pub const ENV_SEPARATOR: &str = "__";

const BASE_FILE: &str = "publisher.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load with the detected environment from the default directory
    pub fn load() -> ConfigResult<PublisherConfig> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(&Self::default_config_directory(), &environment)
    }

    /// Load from `config_dir` for an explicit environment.
    ///
    /// Missing files are skipped; environment variables still apply.
    pub fn load_from_directory_with_env(
        config_dir: &Path,
        environment: &str,
    ) -> ConfigResult<PublisherConfig> {
        debug!(
            environment = %environment,
            config_dir = %config_dir.display(),
            "Loading publisher configuration"
        );

        let config: PublisherConfig = ::config::Config::builder()
            .add_source(::config::Config::try_from(&PublisherConfig::default())?)
            .add_source(::config::File::from(config_dir.join(BASE_FILE)).required(false))
            .add_source(
                ::config::File::from(config_dir.join(Self::environment_file(environment)))
                    .required(false),
            )
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;

        info!(
            environment = %environment,
            max_retries = config.execution.max_retries,
            staleness_window_seconds = config.execution.staleness_window_seconds,
            web_enabled = config.web.enabled,
            "Configuration loaded successfully"
        );
        debug!(config = %config.sanitized(), "Effective configuration");

        Ok(config)
    }

    pub fn detect_environment() -> String {
        env::var(ENVIRONMENT_VARIABLE)
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    pub fn default_config_directory() -> PathBuf {
        env::var(CONFIG_DIR_VARIABLE)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config"))
    }

    fn environment_file(environment: &str) -> String {
        format!("publisher.{environment}.toml")
    }
}
