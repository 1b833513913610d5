use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use domain::{GroupId, UserId};

/// Realtime event names as seen by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "session:created")]
    SessionCreated,
    #[serde(rename = "session:started")]
    SessionStarted,
    #[serde(rename = "vote:cast")]
    VoteCast,
    #[serde(rename = "session:ended")]
    SessionEnded,
    #[serde(rename = "session:cancelled")]
    SessionCancelled,
    #[serde(rename = "group:member-joined")]
    MemberJoined,
    #[serde(rename = "group:member-left")]
    MemberLeft,
    #[serde(rename = "group:deleted")]
    GroupDeleted,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SessionCreated => "session:created",
            EventKind::SessionStarted => "session:started",
            EventKind::VoteCast => "vote:cast",
            EventKind::SessionEnded => "session:ended",
            EventKind::SessionCancelled => "session:cancelled",
            EventKind::MemberJoined => "group:member-joined",
            EventKind::MemberLeft => "group:member-left",
            EventKind::GroupDeleted => "group:deleted",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who receives a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Audience {
    Group(GroupId),
    User(UserId),
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Group(id) => write!(f, "group:{}", id),
            Audience::User(id) => write!(f, "user:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub audience: Audience,
    pub event: EventKind,
    pub payload: serde_json::Value,
    pub sent_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(audience: Audience, event: EventKind, payload: serde_json::Value) -> Self {
        Self {
            audience,
            event,
            payload,
            sent_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_match_wire_format() {
        for kind in [
            EventKind::SessionCreated,
            EventKind::SessionStarted,
            EventKind::VoteCast,
            EventKind::SessionEnded,
            EventKind::SessionCancelled,
            EventKind::MemberJoined,
            EventKind::MemberLeft,
            EventKind::GroupDeleted,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_audience_display() {
        assert_eq!(Audience::User("u1".into()).to_string(), "user:u1");
    }
}
