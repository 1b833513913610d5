//! The `Notifier` port and its in-process implementations.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use domain::GroupId;

use crate::error::Result;
use crate::event::{Audience, EventKind, Notification};

/// Outbound realtime fan-out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_group(
        &self,
        group_id: GroupId,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<()>;

    async fn notify_user(
        &self,
        user_id: &str,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<()>;
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_group(
        &self,
        group_id: GroupId,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<()> {
        info!(%group_id, event = event.as_str(), %payload, "group event");
        Ok(())
    }

    async fn notify_user(
        &self,
        user_id: &str,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<()> {
        info!(user_id, event = event.as_str(), %payload, "user event");
        Ok(())
    }
}

/// Publishes events on a tokio broadcast channel.
///
/// Sending with no subscribers is not an error; realtime clients come and go.
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    fn publish(&self, notification: Notification) {
        match self.sender.send(notification) {
            Ok(receivers) => debug!(receivers, "notification published"),
            Err(_) => debug!("notification dropped, no subscribers"),
        }
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn notify_group(
        &self,
        group_id: GroupId,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.publish(Notification::new(Audience::Group(group_id), event, payload));
        Ok(())
    }

    async fn notify_user(
        &self,
        user_id: &str,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<()> {
        self.publish(Notification::new(
            Audience::User(user_id.to_string()),
            event,
            payload,
        ));
        Ok(())
    }
}

/// Delivers to every inner notifier; reports the first failure after
/// all of them have been tried.
#[derive(Clone, Default)]
pub struct CompositeNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl CompositeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

#[async_trait]
impl Notifier for CompositeNotifier {
    async fn notify_group(
        &self,
        group_id: GroupId,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<()> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify_group(group_id, event, payload.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn notify_user(
        &self,
        user_id: &str,
        event: EventKind,
        payload: serde_json::Value,
    ) -> Result<()> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify_user(user_id, event, payload.clone()).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
