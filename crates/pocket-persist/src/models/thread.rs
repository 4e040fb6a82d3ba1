use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use super::message::ChatMessage;

pub const DEFAULT_THREAD_TITLE: &str = "New Chat";

/// One persisted conversation
///
/// `created_at` is stored as epoch milliseconds under `timestamp`, the
/// field name the snapshot format has always used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    #[serde(
        rename = "timestamp",
        alias = "created_at",
        with = "chrono::serde::ts_milliseconds"
    )]
    pub created_at: DateTime<Utc>,
}

impl Thread {
    /// New thread titled "New Chat" whose log starts with `first`
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>, first: ChatMessage) -> Self {
        Self {
            id: id.into(),
            title: DEFAULT_THREAD_TITLE.to_string(),
            messages: vec![first],
            created_at,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Number of messages sent by the user
    pub fn user_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.is_user()).count()
    }
}
