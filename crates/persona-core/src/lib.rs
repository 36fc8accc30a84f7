//! Persona Core - Foundation crate for the Persona lookup client.
//!
//! This crate provides shared types, error handling, and configuration
//! management that the vault, client, and CLI crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`Credential`, `TargetIdentifier`, `JobId`)
//!
//! # Example
//!
//! ```rust
//! use persona_core::{AppConfig, TargetIdentifier};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.polling.interval_secs, 10);
//!
//! let target = TargetIdentifier::new("eloy.simoesjr")?;
//! println!("Looking up {target}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, MAX_DURATION_SECS, PollingConfig, ServiceConfig, StorageConfig};
pub use error::{ConfigError, ConfigResult, PersonaError, Result};
pub use types::{Credential, JobId, TargetIdentifier};
