use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat line, as sent by a client or produced by the responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub user_name: String,
    pub message: String,
}

impl ChatMessage {
    pub fn new(user_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            message: message.into(),
        }
    }
}

/// A notebook entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub title: String,
    pub content: String,
}

/// Stored form of a collection entry.
///
/// `seq` is assigned by the collection on append and is never reused, so
/// ordering does not depend on how the backing file happens to lay entries out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record<T> {
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub item: T,
}

impl<T> Record<T> {
    pub fn into_item(self) -> T {
        self.item
    }
}

/// Public user info (no password hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}
