use thiserror::Error;

use super::models::CreateTaskRequest;
use crate::config::ApiLimits;

/// Request-shape checks done before the manager sees the URLs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestValidationError {
    #[error("urls must contain between 1 and {max} entries, got {count}")]
    UrlCount { count: usize, max: usize },
}

pub fn validate_request(
    request: &CreateTaskRequest,
    limits: &ApiLimits,
) -> Result<(), RequestValidationError> {
    let count = request.urls.len();
    let max = limits.max_urls_per_task;

    if !(1..=max).contains(&count) {
        return Err(RequestValidationError::UrlCount { count, max });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(count: usize) -> CreateTaskRequest {
        CreateTaskRequest {
            urls: (0..count)
                .map(|i| format!("https://example.com/{i}"))
                .collect(),
        }
    }

    fn limits(max: usize) -> ApiLimits {
        ApiLimits {
            max_urls_per_task: max,
            ..ApiLimits::default()
        }
    }

    #[test]
    fn test_within_limit() {
        assert!(validate_request(&request(1), &limits(3)).is_ok());
        assert!(validate_request(&request(3), &limits(3)).is_ok());
    }

    #[test]
    fn test_too_many_urls() {
        assert_eq!(
            validate_request(&request(4), &limits(3)),
            Err(RequestValidationError::UrlCount { count: 4, max: 3 })
        );
    }

    #[test]
    fn test_empty_urls() {
        assert!(matches!(
            validate_request(&request(0), &limits(3)),
            Err(RequestValidationError::UrlCount { count: 0, .. })
        ));
    }
}
