//! Database schema and types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS chat_history (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    messages TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chat_history_user_updated
    ON chat_history(user_id, updated_at DESC);
";

/// One transcript entry
///
/// Field names follow the stored document shape (`isAnswer`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,
    pub is_answer: bool,
}

impl Message {
    pub fn question(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_answer: false,
        }
    }

    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_answer: true,
        }
    }
}

/// Persisted conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    /// Text of the first message, fixed at creation
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Most recent question in the record, if any
    pub fn last_question(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| !m.is_answer)
            .map(|m| m.text.as_str())
    }
}
