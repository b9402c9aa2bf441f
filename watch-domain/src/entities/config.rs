// Runtime configuration entity

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_MINUTES_LEFT: i64 = 70;
pub const DEFAULT_ALARM_LEAD_MINUTES: i64 = 12;

/// What the fetch client does when the server rejects the bearer token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthFailurePolicy {
    /// Ask the operator for a new token on stdin and retry once.
    #[default]
    Reprompt,
    /// Stop the process with a non-zero exit.
    Exit,
}

impl std::str::FromStr for AuthFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reprompt" | "prompt" => Ok(AuthFailurePolicy::Reprompt),
            "exit" | "abort" => Ok(AuthFailurePolicy::Exit),
            other => Err(format!("unknown auth failure policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub poll_interval_seconds: u64,
    pub min_minutes_left: i64,
    pub reward_filter: Vec<i64>,
    pub verbose_on_ineligible: bool,
    pub chat_alerts_enabled: bool,
    pub alarm_lead_minutes: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 30,
            min_minutes_left: DEFAULT_MIN_MINUTES_LEFT,
            reward_filter: Vec::new(),
            verbose_on_ineligible: false,
            chat_alerts_enabled: false,
            alarm_lead_minutes: DEFAULT_ALARM_LEAD_MINUTES,
        }
    }
}
