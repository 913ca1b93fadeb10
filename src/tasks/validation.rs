use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("urls list cannot be empty")]
    EmptyUrls,
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Every URL must parse as an absolute http/https URL with a host
pub fn validate_urls(urls: &[String]) -> Result<(), ValidationError> {
    if urls.is_empty() {
        return Err(ValidationError::EmptyUrls);
    }

    for raw in urls {
        validate_url(raw)?;
    }

    Ok(())
}

fn validate_url(raw: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }

    Ok(())
}
