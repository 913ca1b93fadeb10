//! Configuration management for batchfetch
//!
//! Settings are layered, lowest priority first:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//! 4. Command line flags (applied by the binary)
//!
//! # Usage
//!
//! ```no_run
//! use batchfetch::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Any key can be overridden with `BATCHFETCH__<section>__<key>`:
//! - `BATCHFETCH__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `BATCHFETCH__MANAGER__WORKERS=8`
//! - `BATCHFETCH__STORAGE__BACKEND=fjall`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/batchfetch.toml`.
//! This can be overridden using the `BATCHFETCH_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::ByteSize;
pub use models::{
    ApiLimits, Config, DownloaderConfig, ManagerConfig, ServerConfig, StorageBackend,
    StorageConfig,
};
pub use sources::default_path;
pub use validation::ValidationError;

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Failed to render configuration: {0}")]
    RenderError(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// The result is not validated yet: command line overrides still have to
    /// be applied, then call [`Config::validate`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(sources::load()?)
    }

    /// Load configuration from a specific path, unvalidated like [`Config::load`]
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(sources::load_from_sources(path.as_ref())?)
    }

    /// Check the final configuration, after every layer was applied
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate(self)
    }

    /// Effective configuration as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
