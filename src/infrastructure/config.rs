//! Configuration infrastructure
//!
//! Settings are layered, lowest priority first:
//! 1. Built-in defaults ([`defaults`])
//! 2. `config.toml` in the user config directory (optional)
//! 3. A file passed with `--config` (optional)
//! 4. `DATASET_SCRAPER_*` environment variables (`__` separates sections)
//! 5. Command-line flags, applied by the CLI on top of the loaded settings

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Runner defaults (overridable per invocation)
    pub run: RunSettings,

    /// HTTP client used by selector scripts
    pub http: HttpSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Delay before each item in milliseconds
    pub delay_ms: u64,

    /// Maximum items per run; unset means no limit
    pub limit: Option<usize>,

    /// Write the output document with indentation
    pub pretty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Upper bound on requests per second, on top of the per-item delay
    pub max_requests_per_second: u32,

    pub follow_redirects: bool,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files; defaults to `logs/` next to the executable
    pub log_dir: Option<PathBuf>,

    /// Module-specific log level filters (e.g., "reqwest": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            delay_ms: defaults::DELAY_MS,
            limit: None,
            pretty: false,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            follow_redirects: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            module_filters: HashMap::new(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "http.timeout_seconds must be greater than 0".to_string(),
            });
        }
        if self.http.max_requests_per_second == 0 {
            return Err(ConfigError::Validation {
                message: "http.max_requests_per_second must be greater than 0".to_string(),
            });
        }
        if !self.logging.console_output && !self.logging.file_output {
            return Err(ConfigError::Validation {
                message: "logging needs console_output or file_output".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration manager for locating and loading settings
pub struct ConfigManager {
    pub config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(defaults::APP_DIR_NAME))
    }

    /// Manager reading `config.toml` from the user config directory, if there is one
    pub fn new() -> Self {
        Self {
            config_path: Self::get_config_dir().map(|dir| dir.join(defaults::CONFIG_FILE_NAME)),
        }
    }

    /// Manager that ignores the user config directory
    pub fn without_user_config() -> Self {
        Self { config_path: None }
    }

    /// Load layered settings; `explicit` must exist when given.
    pub fn load_settings(&self, explicit: Option<&Path>) -> Result<Settings, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?);

        if let Some(user) = &self.config_path {
            debug!("User config candidate: {:?}", user);
            builder = builder.add_source(config::File::from(user.as_path()).required(false));
        }
        if let Some(path) = explicit {
            info!("Loading configuration from: {:?}", path);
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Default configuration values
pub mod defaults {
    /// Directory name under the platform config dir
    pub const APP_DIR_NAME: &str = "dataset-scraper";

    /// User configuration file name
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// Environment variable prefix
    pub const ENV_PREFIX: &str = "DATASET_SCRAPER";

    /// Default delay before each item in milliseconds
    pub const DELAY_MS: u64 = 500;

    /// Default user agent for page fetches
    pub const USER_AGENT: &str = "dataset-scraper/0.3 (+https://github.com/Chanseok/dataset-scraper)";

    /// Default request timeout in seconds
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    /// Default requests per second ceiling
    pub const MAX_REQUESTS_PER_SECOND: u32 = 2;

    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;
}
