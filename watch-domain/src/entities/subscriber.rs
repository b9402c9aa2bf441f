// Subscriber entity
// One chat recipient of broadcast alerts

use serde::{Deserialize, Serialize};

pub const DEFAULT_DISPLAY_NAME: &str = "NoUsername";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub chat_id: i64,
    pub display_name: String,
}

impl Subscriber {
    pub fn new(chat_id: i64, display_name: Option<&str>) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
            .replace([',', '\n', '\r'], " ");
        Self {
            chat_id,
            display_name,
        }
    }

    /// Parses one `id,displayName` record.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let (id, name) = match trimmed.split_once(',') {
            Some((id, name)) => (id, name),
            None => (trimmed, ""),
        };
        let chat_id = id.trim().parse::<i64>().ok()?;
        Some(Self {
            chat_id,
            display_name: name.trim().to_string(),
        })
    }

    pub fn to_line(&self) -> String {
        format!("{},{}", self.chat_id, self.display_name)
    }
}
