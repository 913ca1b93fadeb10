use super::models::Config;
use crate::humanize::ByteSize;
use thiserror::Error;
use url::Url;

const MAX_PAYLOAD_LIMIT: ByteSize = ByteSize(5 * 1024 * 1024);

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("manager.workers must be at least 1")]
    NoWorkers,

    #[error("manager.queue_capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("server.shutdown_timeout_secs must be positive")]
    ZeroShutdownTimeout,

    #[error("max_payload_bytes ({actual}) exceeds limit of 5MB ({limit})")]
    PayloadSizeExceedsLimit { actual: u64, limit: u64 },

    #[error("server.api.max_urls_per_task must be at least 1")]
    ZeroUrlLimit,

    #[error("Downloader timeout must be positive: {field}")]
    ZeroTimeout { field: &'static str },

    #[error("Invalid proxy '{proxy}': {reason}")]
    InvalidProxy { proxy: String, reason: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_manager(config)?;
    validate_server(config)?;
    validate_downloader(config)?;
    Ok(())
}

fn validate_manager(config: &Config) -> Result<(), ValidationError> {
    if config.manager.workers == 0 {
        return Err(ValidationError::NoWorkers);
    }
    if config.manager.queue_capacity == 0 {
        return Err(ValidationError::ZeroQueueCapacity);
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<(), ValidationError> {
    if config.server.shutdown_timeout_secs == 0 {
        return Err(ValidationError::ZeroShutdownTimeout);
    }

    let actual = config.server.api.max_payload_bytes;
    if actual > MAX_PAYLOAD_LIMIT {
        return Err(ValidationError::PayloadSizeExceedsLimit {
            actual: actual.as_u64(),
            limit: MAX_PAYLOAD_LIMIT.as_u64(),
        });
    }

    if config.server.api.max_urls_per_task == 0 {
        return Err(ValidationError::ZeroUrlLimit);
    }
    Ok(())
}

fn validate_downloader(config: &Config) -> Result<(), ValidationError> {
    let downloader = &config.downloader;

    if downloader.connect_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "connect_timeout_secs",
        });
    }
    if downloader.request_timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout {
            field: "request_timeout_secs",
        });
    }

    if let Some(proxy) = &downloader.proxy {
        let parsed = Url::parse(proxy).map_err(|e| ValidationError::InvalidProxy {
            proxy: proxy.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(parsed.scheme(), "http" | "https" | "socks5") {
            return Err(ValidationError::InvalidProxy {
                proxy: proxy.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
    }

    Ok(())
}
