//! Core error types for Persona.
//!
//! Subsystem crates (vault, client) define their own error enums; this
//! module holds the errors raised by shared types and configuration.

use thiserror::Error;

/// Central error type for shared Persona operations.
#[derive(Error, Debug)]
pub enum PersonaError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Target identifier failed the syntax check
    #[error("invalid target identifier: {0}")]
    InvalidIdentifier(String),

    /// Validation errors (invalid input, constraints)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `PersonaError`.
pub type Result<T> = std::result::Result<T, PersonaError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PersonaError::InvalidIdentifier("bad id!".to_string());
        assert_eq!(err.to_string(), "invalid target identifier: bad id!");

        let err = ConfigError::InvalidValue {
            field: "polling.interval_secs".to_string(),
            reason: "must be greater than zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for polling.interval_secs: must be greater than zero"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: PersonaError = config_err.into();
        assert!(matches!(err, PersonaError::Config(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: PersonaError = io_err.into();
        assert!(matches!(err, PersonaError::Io(_)));
    }
}
