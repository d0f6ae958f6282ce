use crate::domain_model::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub const UNKNOWN_USERNAME: &str = "Unknown";

static LOCAL_ID_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Id for a message the server did not number. The clock reading keeps
    /// ids readable; the process-wide sequence keeps them unique when two
    /// are minted within the same millisecond.
    pub fn local(now: DateTime<Utc>) -> Self {
        let seq = LOCAL_ID_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("local-{}-{}", now.timestamp_millis(), seq))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a log entry came to be.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Delivery {
    /// Sent by us, echo not seen yet.
    Pending,
    /// Sent by us and echoed back by the server.
    Confirmed,
    /// Sent by us, but the transport refused it. Kept visible.
    Failed,
    /// Pushed by the server.
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub user_id: UserId,
    pub username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub delivery: Delivery,
}

impl ChatMessage {
    /// Absolute distance between two messages' timestamps in milliseconds.
    pub fn millis_apart(&self, other: &ChatMessage) -> i64 {
        (self.timestamp - other.timestamp).num_milliseconds().abs()
    }
}

// region wire

/// Chat record as written to the socket.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    #[serde(rename = "userID")]
    pub user_id: UserId,
    pub username: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatMessage> for OutgoingMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            user_id: message.user_id,
            username: message.username.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl From<WireId> for MessageId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => MessageId(s),
            WireId::Number(n) => MessageId(n.to_string()),
        }
    }
}

/// Chat record as read from the socket. Every field is optional; see
/// [`IncomingMessage::into_message`] for the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<WireId>,
    #[serde(default, rename = "userID")]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl IncomingMessage {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn into_message(self, now: DateTime<Utc>) -> ChatMessage {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(now);

        ChatMessage {
            id: self
                .id
                .map(MessageId::from)
                .unwrap_or_else(|| MessageId::local(now)),
            user_id: self.user_id.map(UserId).unwrap_or(UserId::GUEST),
            username: self
                .username
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| UNKNOWN_USERNAME.to_owned()),
            content: self.content.unwrap_or_default(),
            timestamp,
            delivery: Delivery::Remote,
        }
    }
}

// endregion
