use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::{Path, PathBuf};

const CONFIG_ENV_VAR: &str = "BATCHFETCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/batchfetch.toml";
const ENV_PREFIX: &str = "BATCHFETCH";
const ENV_SEPARATOR: &str = "__";

/// Path of the TOML file: `BATCHFETCH_CONFIG` or the default location
pub fn default_path() -> PathBuf {
    env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration with priority (lowest first):
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. `.env` file (via dotenvy)
/// 4. Process environment
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();
    load_from_sources(&default_path())
}

/// Load configuration from a specific path and environment
pub fn load_from_sources(config_path: &Path) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::warn!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // BATCHFETCH__MANAGER__WORKERS -> manager.workers
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(&config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.manager.workers, 3);
        assert_eq!(config.manager.queue_capacity, 100);
        assert_eq!(config.storage.backend, StorageBackend::File);
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "127.0.0.1:9000"
shutdown_timeout_secs = 5

[server.api]
max_payload_bytes = "2MB"
max_urls_per_task = 50

[manager]
workers = 8
queue_capacity = 16

[storage]
backend = "fjall"
path = "data/tasks"

[downloader]
download_dir = "data/files"
proxy = "http://proxy:3128"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = load_from_sources(&config_path).unwrap();
        assert_eq!(config.server.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(config.server.shutdown_timeout_secs, 5);
        assert_eq!(config.server.api.max_payload_bytes.as_u64(), 2 * 1024 * 1024);
        assert_eq!(config.server.api.max_urls_per_task, 50);
        assert_eq!(config.manager.workers, 8);
        assert_eq!(config.manager.queue_capacity, 16);
        assert_eq!(config.storage.backend, StorageBackend::Fjall);
        assert_eq!(config.storage.path, PathBuf::from("data/tasks"));
        assert_eq!(config.downloader.download_dir, PathBuf::from("data/files"));
        assert_eq!(config.downloader.proxy.as_deref(), Some("http://proxy:3128"));
        assert_eq!(config.downloader.connect_timeout_secs, 10);
    }

    #[test]
    fn test_unknown_backend_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "[storage]\nbackend = \"s3\"\n").unwrap();

        assert!(load_from_sources(&config_path).is_err());
    }
}
