use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for the ImageTrace client core
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ImageTraceConfig {
    /// Where the analysis backend listens
    #[serde(default)]
    pub backend: BackendConfig,

    /// Readiness probe backoff and manual-retry window
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Job status polling
    #[serde(default)]
    pub polling: PollingConfig,

    /// Similarity graph defaults
    #[serde(default)]
    pub graph: GraphConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Base URL of the analysis backend (e.g., "http://127.0.0.1:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Readiness probe timing.
///
/// Failed probes wait `base_delay_ms`, then grow by `delay_step_ms` per
/// consecutive failure up to `max_delay_ms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadinessConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_delay_step_ms")]
    pub delay_step_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Delay after start before a manual retry is offered (default: 120s)
    #[serde(default = "default_retry_visibility_delay_ms")]
    pub retry_visibility_delay_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            delay_step_ms: default_delay_step_ms(),
            max_delay_ms: default_max_delay_ms(),
            retry_visibility_delay_ms: default_retry_visibility_delay_ms(),
        }
    }
}

/// Job status polling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Fixed interval between status fetches (default: 3000ms)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Reported when the backend fails a job without a message
    #[serde(default = "default_failure_message")]
    pub default_failure_message: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            default_failure_message: default_failure_message(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphConfig {
    /// Threshold applied before the user picks one
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_threshold: default_threshold(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "compact", "pretty", "full", "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_base_delay_ms() -> u64 {
    800
}
fn default_delay_step_ms() -> u64 {
    400
}
fn default_max_delay_ms() -> u64 {
    4000
}
fn default_retry_visibility_delay_ms() -> u64 {
    120_000
}
fn default_poll_interval_ms() -> u64 {
    3000
}
fn default_failure_message() -> String {
    "Analysis failed".to_string()
}
fn default_threshold() -> f64 {
    0.3
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}

const LOG_FORMATS: [&str; 4] = ["compact", "pretty", "full", "json"];

/// Configuration manager with file discovery and environment overrides
pub struct ConfigManager {
    config: ImageTraceConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file)
    /// 2. Config file (.imagetrace.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();

        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!(
                target: "imagetrace::config",
                path = %path.display(),
                backend = %config.backend.base_url,
                "Configuration loaded"
            ),
            None => info!(
                target: "imagetrace::config",
                backend = %config.backend.base_url,
                "Configuration loaded from defaults"
            ),
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load one explicit config file, then apply environment overrides
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::read_toml_file(path)?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an in-memory config after validating it
    pub fn from_config(config: ImageTraceConfig) -> Result<Self, ConfigError> {
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: None,
        })
    }

    pub fn config(&self) -> &ImageTraceConfig {
        &self.config
    }

    pub fn into_config(self) -> ImageTraceConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".imagetrace.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    warn!("Failed to load .imagetrace.env: {}", e);
                }
            }
        }
    }

    /// Search order:
    /// 1. ./.imagetrace.toml
    /// 2. ~/.imagetrace/config.toml
    fn load_config_file() -> Result<(ImageTraceConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".imagetrace.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".imagetrace").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((ImageTraceConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<ImageTraceConfig, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<ImageTraceConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: ImageTraceConfig) -> ImageTraceConfig {
        if let Ok(url) = std::env::var("IMAGETRACE_BACKEND_URL") {
            config.backend.base_url = url;
        }
        if let Ok(timeout) = std::env::var("IMAGETRACE_REQUEST_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => config.backend.request_timeout_secs = secs,
                Err(_) => warn!("Ignoring invalid IMAGETRACE_REQUEST_TIMEOUT_SECS: {}", timeout),
            }
        }
        if let Ok(interval) = std::env::var("IMAGETRACE_POLL_INTERVAL_MS") {
            match interval.parse() {
                Ok(ms) => config.polling.interval_ms = ms,
                Err(_) => warn!("Ignoring invalid IMAGETRACE_POLL_INTERVAL_MS: {}", interval),
            }
        }
        if let Ok(threshold) = std::env::var("IMAGETRACE_DEFAULT_THRESHOLD") {
            match threshold.parse() {
                Ok(value) => config.graph.default_threshold = value,
                Err(_) => warn!("Ignoring invalid IMAGETRACE_DEFAULT_THRESHOLD: {}", threshold),
            }
        }
        if let Ok(level) = std::env::var("IMAGETRACE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("IMAGETRACE_LOG_FORMAT") {
            config.logging.format = format;
        }
        config
    }

    pub fn validate_config(config: &ImageTraceConfig) -> Result<(), ConfigError> {
        if config.backend.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.base_url must not be empty".to_string(),
            ));
        }
        if config.readiness.base_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "readiness.base_delay_ms must be greater than zero".to_string(),
            ));
        }
        if config.readiness.max_delay_ms < config.readiness.base_delay_ms {
            return Err(ConfigError::ValidationError(format!(
                "readiness.max_delay_ms ({}) is below base_delay_ms ({})",
                config.readiness.max_delay_ms, config.readiness.base_delay_ms
            )));
        }
        if config.polling.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "polling.interval_ms must be greater than zero".to_string(),
            ));
        }
        let threshold = config.graph.default_threshold;
        if !(0.1..=1.0).contains(&threshold) {
            return Err(ConfigError::ValidationError(format!(
                "graph.default_threshold {} is outside [0.1, 1.0]",
                threshold
            )));
        }
        if !LOG_FORMATS.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.format '{}' is not one of {:?}",
                config.logging.format, LOG_FORMATS
            )));
        }
        Ok(())
    }
}
