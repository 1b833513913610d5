//! Best-effort delivery on behalf of state-changing operations.
//!
//! A failed or slow notification is logged at `warn` and otherwise ignored;
//! it never changes the outcome of the operation that triggered it.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use domain::GroupId;

use crate::error::NotifyError;
use crate::event::EventKind;
use crate::notifier::Notifier;

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Notify a group. Returns whether delivery succeeded, for logging only.
    pub async fn group(&self, group_id: GroupId, event: EventKind, payload: serde_json::Value) -> bool {
        let outcome = timeout(
            self.timeout,
            self.notifier.notify_group(group_id, event, payload),
        )
        .await
        .unwrap_or(Err(NotifyError::Timeout(self.timeout)));

        match outcome {
            Ok(()) => true,
            Err(error) => {
                warn!(%group_id, event = event.as_str(), %error, "group notification failed");
                false
            }
        }
    }

    pub async fn user(&self, user_id: &str, event: EventKind, payload: serde_json::Value) -> bool {
        let outcome = timeout(self.timeout, self.notifier.notify_user(user_id, event, payload))
            .await
            .unwrap_or(Err(NotifyError::Timeout(self.timeout)));

        match outcome {
            Ok(()) => true,
            Err(error) => {
                warn!(user_id, event = event.as_str(), %error, "user notification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use serde_json::json;

    struct StuckNotifier;

    #[async_trait]
    impl Notifier for StuckNotifier {
        async fn notify_group(&self, _: GroupId, _: EventKind, _: serde_json::Value) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }

        async fn notify_user(&self, _: &str, _: EventKind, _: serde_json::Value) -> Result<()> {
            Err(NotifyError::Closed)
        }
    }

    #[tokio::test]
    async fn test_slow_delivery_times_out() {
        let dispatcher =
            Dispatcher::new(Arc::new(StuckNotifier)).with_timeout(Duration::from_millis(20));
        assert!(
            !dispatcher
                .group(GroupId::new_v4(), EventKind::SessionEnded, json!({}))
                .await
        );
    }

    #[tokio::test]
    async fn test_failed_delivery_is_reported_not_raised() {
        let dispatcher = Dispatcher::new(Arc::new(StuckNotifier));
        assert!(!dispatcher.user("u1", EventKind::VoteCast, json!({})).await);
    }

    #[tokio::test]
    async fn test_successful_delivery() {
        let dispatcher = Dispatcher::new(Arc::new(crate::notifier::LogNotifier));
        assert!(dispatcher.user("u1", EventKind::VoteCast, json!({})).await);
    }
}
