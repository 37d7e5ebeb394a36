use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Avatar assigned to every account at registration.
pub const DEFAULT_AVATAR: &str = "/static/avatars/default.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub avatar: String,
}

/// One entry of the message log, persisted as a JSON object.
///
/// Messages carry no id of their own; they are identified by their position
/// in the log. `sender_id` and `recipient_id` are weak references to accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender_id: i64,
    pub recipient_id: i64,
    pub text: Option<String>,
    pub file_path: Option<String>,
    /// UTC instant the message was written, used for retention.
    pub timestamp: DateTime<Utc>,
    /// Display time (`HH:MM`) in the server's local timezone.
    pub time: String,
}

impl ChatMessage {
    /// True when the message belongs to the conversation between `a` and `b`,
    /// regardless of direction.
    pub fn is_between(&self, a: i64, b: i64) -> bool {
        (self.sender_id == a && self.recipient_id == b)
            || (self.sender_id == b && self.recipient_id == a)
    }
}

/// A message before it is stamped and written to the log.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub sender_id: i64,
    pub recipient_id: i64,
    pub text: Option<String>,
    pub file_path: Option<String>,
}
