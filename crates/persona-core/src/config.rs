//! Configuration management for Persona.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for every duration setting (one week).
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Main application configuration.
///
/// This is loaded from `~/.config/persona/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Remote analysis service settings
    pub service: ServiceConfig,
    /// Job polling behavior
    pub polling: PollingConfig,
    /// Local credential storage
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `config_path`, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `PERSONA_BASE_URL`: Override the service base URL
    /// - `PERSONA_POLL_INTERVAL_SECS`: Override the poll interval
    /// - `PERSONA_SETTLE_DELAY_SECS`: Override the post-completion settle delay
    /// - `PERSONA_POLL_TIMEOUT_SECS`: Override the overall poll deadline
    /// - `PERSONA_CREDENTIAL_DIR`: Override where the credential files live
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (usually the process environment).
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("PERSONA_BASE_URL") {
            tracing::debug!("Override service.base_url from env: {}", url);
            self.service.base_url = url;
        }

        override_secs(
            &lookup,
            "PERSONA_POLL_INTERVAL_SECS",
            &mut self.polling.interval_secs,
        );
        override_secs(
            &lookup,
            "PERSONA_SETTLE_DELAY_SECS",
            &mut self.polling.settle_delay_secs,
        );
        override_secs(
            &lookup,
            "PERSONA_POLL_TIMEOUT_SECS",
            &mut self.polling.timeout_secs,
        );

        if let Some(dir) = lookup("PERSONA_CREDENTIAL_DIR") {
            tracing::debug!("Override storage.credential_dir from env: {}", dir);
            self.storage.credential_dir = Some(PathBuf::from(dir));
        }
    }

    /// Check values that would make the poll loop misbehave.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.polling.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "polling.interval_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.polling.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "polling.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        let durations = [
            ("service.request_timeout_secs", self.service.request_timeout_secs),
            ("polling.interval_secs", self.polling.interval_secs),
            ("polling.settle_delay_secs", self.polling.settle_delay_secs),
            ("polling.timeout_secs", self.polling.timeout_secs),
            ("polling.max_backoff_secs", self.polling.max_backoff_secs),
        ];
        for (field, secs) in durations {
            if secs > MAX_DURATION_SECS {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("must not exceed {MAX_DURATION_SECS} seconds"),
                });
            }
        }
        if self.polling.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "polling.max_attempts".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.polling.max_backoff_secs < self.polling.interval_secs {
            return Err(ConfigError::InvalidValue {
                field: "polling.max_backoff_secs".to_string(),
                reason: "must not be smaller than polling.interval_secs".to_string(),
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/persona/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/persona`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    /// Directory holding the key file and the encrypted credential.
    ///
    /// The configured `storage.credential_dir` wins; otherwise the data dir.
    pub fn credential_dir(&self) -> ConfigResult<PathBuf> {
        match &self.storage.credential_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::data_dir(),
        }
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("com", "persona", "persona").ok_or(ConfigError::NoConfigDir)
}

fn override_secs(lookup: &impl Fn(&str) -> Option<String>, name: &str, target: &mut u64) {
    if let Some(val) = lookup(name) {
        match val.parse() {
            Ok(secs) => {
                *target = secs;
                tracing::debug!("Override {} from env: {}", name, secs);
            }
            Err(_) => tracing::warn!("Ignoring non-numeric {}={}", name, val),
        }
    }
}

/// Remote analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the service API (no trailing slash needed)
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://irbis.espysys.com/api".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Job polling behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between status queries while the job is running
    pub interval_secs: u64,
    /// Wait after the first FINISHED before fetching the final payload
    pub settle_delay_secs: u64,
    /// Maximum number of status queries before giving up
    pub max_attempts: u32,
    /// Overall deadline for one job, in seconds
    pub timeout_secs: u64,
    /// Ceiling for the backoff applied after transient failures
    pub max_backoff_secs: u64,
}

impl PollingConfig {
    /// Poll interval as a `Duration`.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Settle delay as a `Duration`.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Overall deadline as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Backoff ceiling as a `Duration`.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            settle_delay_secs: 20,
            max_attempts: 180,
            timeout_secs: 1800,
            max_backoff_secs: 120,
        }
    }
}

/// Local credential storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for the key file and encrypted credential (defaults to the data dir)
    pub credential_dir: Option<PathBuf>,
}
