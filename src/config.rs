//! YAML configuration for the Argus service.
//!
//! Every section is optional and falls back to its defaults, so an empty
//! document with just a `version` is a valid configuration.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "newsroom"
//!
//! parser:
//!   pool_size: 4
//!   default_language: "en"
//!   languages: ["en", "de", "fr"]
//!
//! fetch:
//!   timeout_secs: 30
//!   max_body_bytes: 10485760
//!
//! jobs:
//!   failure_threshold: 10
//!   notification_timeout_secs: 10
//!   min_interval_secs: 60
//!   max_interval_secs: 2592000
//!   diff_history: 16
//!
//! readers: ["plain", "html", "xml", "json"]
//!
//! logging:
//!   level: "info"
//!   json: true
//!
//! subscriptions:
//!   - documentUrl: "https://example.org/argus"
//!     documentContentType: "text/html"
//!     clientUrl: "https://client.example/hooks/argus"
//!     keywords: ["norse", "hundred eyes"]
//!     interval: 600
//!     slop: 1
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use canonical::{DEFAULT_LANGUAGE, LanguageResources};
use ingest::{FetchConfig, ReaderKind, ReaderRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manager::JobSettings;
use crate::request::SubscribeRequest;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

impl ConfigLoadError {
    /// True when the file itself does not exist.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, ConfigLoadError::FileRead(err) if err.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ArgusConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub parser: ParserYamlConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub jobs: JobsYamlConfig,

    /// Enabled document readers
    #[serde(default = "default_readers")]
    pub readers: Vec<ReaderKind>,

    #[serde(default)]
    pub logging: LoggingYamlConfig,

    /// Subscriptions registered at startup
    #[serde(default)]
    pub subscriptions: Vec<SubscribeRequest>,
}

impl ArgusConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: ArgusConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.parser.validate()?;
        self.jobs.validate()?;
        self.logging.validate()?;

        if self.fetch.timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "fetch.timeout_secs must be >= 1".to_string(),
            ));
        }
        if self.fetch.max_body_bytes == 0 {
            return Err(ConfigLoadError::Validation(
                "fetch.max_body_bytes must be >= 1".to_string(),
            ));
        }
        if self.readers.is_empty() {
            return Err(ConfigLoadError::Validation(
                "readers must enable at least one reader".to_string(),
            ));
        }
        for (i, subscription) in self.subscriptions.iter().enumerate() {
            subscription.validate().map_err(|err| {
                ConfigLoadError::Validation(format!("subscriptions[{i}]: {err}"))
            })?;
        }
        Ok(())
    }

    pub fn reader_registry(&self) -> ReaderRegistry {
        ReaderRegistry::from_kinds(&self.readers)
    }
}

impl Default for ArgusConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            parser: ParserYamlConfig::default(),
            fetch: FetchConfig::default(),
            jobs: JobsYamlConfig::default(),
            readers: default_readers(),
            logging: LoggingYamlConfig::default(),
            subscriptions: Vec::new(),
        }
    }
}

/// Tokenizer and language settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserYamlConfig {
    /// Parsers in the shared pool; bounds concurrent tokenization.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_language")]
    pub default_language: String,

    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
}

impl ParserYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.pool_size == 0 {
            return Err(ConfigLoadError::Validation(
                "parser.pool_size must be >= 1".to_string(),
            ));
        }
        if !self
            .languages
            .iter()
            .any(|code| code.eq_ignore_ascii_case(&self.default_language))
        {
            return Err(ConfigLoadError::Validation(format!(
                "parser.default_language {:?} must be listed in parser.languages",
                self.default_language
            )));
        }
        Ok(())
    }

    pub fn language_resources(&self) -> Result<LanguageResources, canonical::LanguageError> {
        LanguageResources::builtin(self.languages.as_slice(), &self.default_language.to_lowercase())
    }
}

impl Default for ParserYamlConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            default_language: default_language(),
            languages: default_languages(),
        }
    }
}

/// Upper bound accepted for `jobs.max_interval_secs`: one year.
const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// Job manager policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsYamlConfig {
    /// Consecutive failed ticks before a watched document is dropped.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_notification_timeout_secs")]
    pub notification_timeout_secs: u64,

    /// Shorter subscription intervals are raised to this.
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Longer subscription intervals are lowered to this.
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,

    /// Tick results kept per document by the diff store.
    #[serde(default = "default_diff_history")]
    pub diff_history: usize,
}

impl JobsYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.failure_threshold == 0 {
            return Err(ConfigLoadError::Validation(
                "jobs.failure_threshold must be >= 1".to_string(),
            ));
        }
        if self.notification_timeout_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "jobs.notification_timeout_secs must be >= 1".to_string(),
            ));
        }
        if self.min_interval_secs == 0 {
            return Err(ConfigLoadError::Validation(
                "jobs.min_interval_secs must be >= 1".to_string(),
            ));
        }
        if self.max_interval_secs < self.min_interval_secs {
            return Err(ConfigLoadError::Validation(
                "jobs.max_interval_secs must be >= jobs.min_interval_secs".to_string(),
            ));
        }
        if self.max_interval_secs > MAX_INTERVAL_SECS {
            return Err(ConfigLoadError::Validation(format!(
                "jobs.max_interval_secs must be <= {MAX_INTERVAL_SECS}"
            )));
        }
        Ok(())
    }

    pub fn settings(&self) -> JobSettings {
        JobSettings {
            failure_threshold: self.failure_threshold,
            notification_timeout: Duration::from_secs(self.notification_timeout_secs),
            min_interval: Duration::from_secs(self.min_interval_secs),
            max_interval: Duration::from_secs(self.max_interval_secs),
        }
    }
}

impl Default for JobsYamlConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            notification_timeout_secs: default_notification_timeout_secs(),
            min_interval_secs: default_min_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
            diff_history: default_diff_history(),
        }
    }
}

/// Log output of the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingYamlConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl LoggingYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LoggingYamlConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_pool_size() -> usize {
    4
}
fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}
fn default_languages() -> Vec<String> {
    ["en", "de", "fr", "es", "it", "pt", "nl"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_failure_threshold() -> u32 {
    10
}
fn default_notification_timeout_secs() -> u64 {
    10
}
fn default_min_interval_secs() -> u64 {
    1
}
fn default_max_interval_secs() -> u64 {
    30 * 24 * 60 * 60
}
fn default_diff_history() -> usize {
    16
}
fn default_readers() -> Vec<ReaderKind> {
    ReaderKind::ALL.to_vec()
}
fn default_log_level() -> String {
    "info".to_string()
}
