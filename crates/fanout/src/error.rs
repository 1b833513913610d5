use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotifyError {
    #[error("notification channel closed")]
    Closed,

    #[error("notification delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

pub type Result<T> = std::result::Result<T, NotifyError>;
