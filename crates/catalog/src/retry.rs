//! Retry decorator for idempotent catalog reads.
//!
//! ## Algorithm
//! 1. Run the request
//! 2. On a retryable error (rate limited, timeout, unavailable) wait and retry,
//!    up to `max_retries` times
//! 3. Delay doubles each attempt starting from `base_delay`; a `Retry-After`
//!    hint replaces the computed delay, capped at `max_delay`

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::error::{CatalogError, Result};
use crate::traits::MovieCatalog;
use crate::types::{Genre, GenreId, Movie, MovieId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 1,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32, err: &CatalogError) -> Duration {
        let backoff = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        let delay = match err {
            CatalogError::RateLimited {
                retry_after: Some(hint),
            } => *hint,
            _ => backoff,
        };
        delay.min(self.max_delay)
    }
}

/// Run `op` under `policy`, retrying retryable failures.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt, &err);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying catalog request"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

pub struct RetryingCatalog {
    inner: Arc<dyn MovieCatalog>,
    policy: RetryPolicy,
}

impl RetryingCatalog {
    pub fn new(inner: Arc<dyn MovieCatalog>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl MovieCatalog for RetryingCatalog {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn search(&self, query: &str, page: u32) -> Result<Vec<Movie>> {
        with_retry(&self.policy, "search", || self.inner.search(query, page)).await
    }

    async fn by_genre(&self, genre_id: GenreId, page: u32) -> Result<Vec<Movie>> {
        with_retry(&self.policy, "by_genre", || self.inner.by_genre(genre_id, page)).await
    }

    async fn by_id(&self, id: MovieId) -> Result<Movie> {
        with_retry(&self.policy, "by_id", || self.inner.by_id(id)).await
    }

    async fn genres(&self) -> Result<Vec<Genre>> {
        with_retry(&self.policy, "genres", || self.inner.genres()).await
    }

    async fn popular(&self, page: u32) -> Result<Vec<Movie>> {
        with_retry(&self.policy, "popular", || self.inner.popular(page)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = &AtomicU32::new(0);
        let result = with_retry(&fast_policy(2), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(CatalogError::Timeout)
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(1), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CatalogError::Unavailable("down".into()))
        })
        .await;
        assert_matches!(result, Err(CatalogError::Unavailable(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(3), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CatalogError::Unauthorized)
        })
        .await;
        assert_matches!(result, Err(CatalogError::Unauthorized));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_doubles_and_honours_hint() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(0, &CatalogError::Timeout), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2, &CatalogError::Timeout), Duration::from_millis(400));
        assert_eq!(policy.delay_for(5, &CatalogError::Timeout), Duration::from_secs(1));

        let limited = CatalogError::RateLimited {
            retry_after: Some(Duration::from_millis(300)),
        };
        assert_eq!(policy.delay_for(0, &limited), Duration::from_millis(300));
    }
}
