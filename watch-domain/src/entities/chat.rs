// Chat entity
// Incoming bot message, transport agnostic

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub update_id: i64,
    pub chat_id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub text: String,
}

impl ChatMessage {
    /// The person behind the message. Falls back to the chat for updates
    /// without a sender, such as channel posts.
    pub fn sender_id(&self) -> i64 {
        self.user_id.unwrap_or(self.chat_id)
    }
}

/// One long-poll result: the messages worth handling plus the offset that
/// acknowledges everything received, including updates that carried no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatUpdates {
    pub messages: Vec<ChatMessage>,
    pub next_offset: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    /// Telegram HTML subset; callers escape user text themselves.
    Html,
}
