use std::time::Duration;

use domain::DomainError;
use thiserror::Error;

/// Catalog failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("catalog rejected credentials")]
    Unauthorized,

    #[error("not found in catalog: {0}")]
    NotFound(String),

    #[error("catalog rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    #[error("catalog request timed out")]
    Timeout,

    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    #[error("catalog transport error: {0}")]
    Transport(String),

    #[error("invalid catalog response: {0}")]
    Decode(String),

    #[error("fixture error: {0}")]
    Fixture(String),
}

impl CatalogError {
    /// Whether an idempotent read may be retried after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CatalogError::RateLimited { .. } | CatalogError::Timeout | CatalogError::Unavailable(_)
        )
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else if err.is_connect() {
            CatalogError::Unavailable(err.to_string())
        } else if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Transport(err.to_string())
        }
    }
}

/// Every catalog failure is reported to callers as `CatalogUnavailable`.
impl From<CatalogError> for DomainError {
    fn from(err: CatalogError) -> Self {
        DomainError::CatalogUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
