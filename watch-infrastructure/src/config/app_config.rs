use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use watch_domain::{AuthFailurePolicy, RuntimeConfig, DEFAULT_ALARM_LEAD_MINUTES, DEFAULT_MIN_MINUTES_LEFT};

use super::validation::validate_http_url;

pub const CONFIG_PATH_ENV: &str = "BATTLEFIELD_CONFIG";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_id: u64,
    pub body_hmac: Option<String>,
    pub bearer_token: Option<String>,
    pub auth_failure_policy: AuthFailurePolicy,
    pub poll_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub min_minutes_left: i64,
    pub reward_filter: Vec<i64>,
    pub verbose_on_ineligible: bool,
    pub rewards_path: String,
    pub subscribers_path: String,
    pub telegram_alerts_enabled: bool,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<i64>,
    pub telegram_api_base_url: String,
    pub bot_enabled: bool,
    pub alarm_lead_minutes: i64,
    pub log_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://gv.gameduo.net".to_string(),
            request_id: 1,
            body_hmac: None,
            bearer_token: None,
            auth_failure_policy: AuthFailurePolicy::Reprompt,
            poll_interval_seconds: 30,
            request_timeout_seconds: 15,
            min_minutes_left: DEFAULT_MIN_MINUTES_LEFT,
            reward_filter: Vec::new(),
            verbose_on_ineligible: false,
            rewards_path: "./rewards.json".to_string(),
            subscribers_path: "./subscribers.txt".to_string(),
            telegram_alerts_enabled: false,
            telegram_token: None,
            telegram_chat_id: None,
            telegram_api_base_url: "https://api.telegram.org".to_string(),
            bot_enabled: true,
            alarm_lead_minutes: DEFAULT_ALARM_LEAD_MINUTES,
            log_dir: None,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "./config.toml".to_string());
        let file_path = Path::new(&path);
        let base_dir = file_path.parent();
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            toml::from_str::<AppConfig>(&content)?
        } else {
            warn!("{} not found, using defaults", path);
            AppConfig::default()
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.resolve_paths(base_dir);
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        self.telegram_api_base_url = self
            .telegram_api_base_url
            .trim()
            .trim_end_matches('/')
            .to_string();
        self.body_hmac = normalize_optional(self.body_hmac.take());
        self.bearer_token = normalize_optional(self.bearer_token.take());
        self.telegram_token = normalize_optional(self.telegram_token.take());
        self.log_dir = normalize_optional(self.log_dir.take());
        if let Some(chat_id) = self.telegram_chat_id {
            if chat_id == 0 {
                self.telegram_chat_id = None;
            }
        }
        self.reward_filter.sort_unstable();
        self.reward_filter.dedup();
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.rewards_path = resolve_path(base, &self.rewards_path);
        self.subscribers_path = resolve_path(base, &self.subscribers_path);
        if let Some(log_dir) = &self.log_dir {
            self.log_dir = Some(resolve_path(base, log_dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_http_url("api_base_url", &self.api_base_url)?;
        validate_http_url("telegram_api_base_url", &self.telegram_api_base_url)?;
        if self.poll_interval_seconds == 0 {
            return Err(anyhow!("poll_interval_seconds must be greater than 0"));
        }
        if self.min_minutes_left <= 0 {
            return Err(anyhow!("min_minutes_left must be greater than 0"));
        }
        if self.alarm_lead_minutes < 0 {
            return Err(anyhow!("alarm_lead_minutes must not be negative"));
        }
        if self.telegram_alerts_enabled && self.telegram_token.is_none() {
            return Err(anyhow!("telegram_alerts_enabled requires telegram_token"));
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            poll_interval_seconds: self.poll_interval_seconds,
            min_minutes_left: self.min_minutes_left,
            reward_filter: self.reward_filter.clone(),
            verbose_on_ineligible: self.verbose_on_ineligible,
            chat_alerts_enabled: self.telegram_alerts_enabled,
            alarm_lead_minutes: self.alarm_lead_minutes,
        }
    }

    /// Bot commands need a token; alerts additionally need the explicit switch.
    pub fn bot_active(&self) -> bool {
        self.bot_enabled && self.telegram_token.is_some()
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("BATTLEFIELD_API_BASE_URL") {
            self.api_base_url = value;
        }
        if let Some(value) = lookup("BATTLEFIELD_REQUEST_ID").or_else(|| lookup("REQUEST_ID")) {
            self.request_id = value.trim().parse().unwrap_or(self.request_id);
        }
        if let Some(value) = lookup("BATTLEFIELD_BODY_HMAC").or_else(|| lookup("BODY_HMAC")) {
            self.body_hmac = Some(value);
        }
        if let Some(value) = lookup("BATTLEFIELD_BEARER_TOKEN") {
            self.bearer_token = Some(value);
        }
        if let Some(value) = lookup("BATTLEFIELD_AUTH_FAILURE_POLICY") {
            match value.parse() {
                Ok(policy) => self.auth_failure_policy = policy,
                Err(err) => warn!("ignoring BATTLEFIELD_AUTH_FAILURE_POLICY: {}", err),
            }
        }
        if let Some(value) = lookup("BATTLEFIELD_POLL_INTERVAL_SECONDS") {
            self.poll_interval_seconds = value.trim().parse().unwrap_or(self.poll_interval_seconds);
        }
        if let Some(value) = lookup("BATTLEFIELD_REQUEST_TIMEOUT_SECONDS") {
            self.request_timeout_seconds =
                value.trim().parse().unwrap_or(self.request_timeout_seconds);
        }
        if let Some(value) = lookup("BATTLEFIELD_MIN_MINUTES_LEFT") {
            self.min_minutes_left = value.trim().parse().unwrap_or(self.min_minutes_left);
        }
        if let Some(value) = lookup("BATTLEFIELD_REWARD_FILTER") {
            self.reward_filter = parse_id_list(&value);
        }
        if let Some(value) = lookup("BATTLEFIELD_VERBOSE_ON_INELIGIBLE") {
            self.verbose_on_ineligible = parse_flag(&value).unwrap_or(self.verbose_on_ineligible);
        }
        if let Some(value) = lookup("BATTLEFIELD_REWARDS_PATH") {
            self.rewards_path = value;
        }
        if let Some(value) = lookup("BATTLEFIELD_SUBSCRIBERS_PATH") {
            self.subscribers_path = value;
        }
        if let Some(value) = lookup("TELEGRAM_ALERTS_ENABLED") {
            self.telegram_alerts_enabled =
                parse_flag(&value).unwrap_or(self.telegram_alerts_enabled);
        }
        if let Some(value) = lookup("TELEGRAM_TOKEN") {
            self.telegram_token = Some(value);
        }
        if let Some(value) = lookup("TELEGRAM_CHAT_ID") {
            self.telegram_chat_id = value.trim().parse().ok();
        }
        if let Some(value) = lookup("BATTLEFIELD_TELEGRAM_API_BASE_URL") {
            self.telegram_api_base_url = value;
        }
        if let Some(value) = lookup("BATTLEFIELD_BOT_ENABLED") {
            self.bot_enabled = parse_flag(&value).unwrap_or(self.bot_enabled);
        }
        if let Some(value) = lookup("BATTLEFIELD_ALARM_LEAD_MINUTES") {
            self.alarm_lead_minutes = value.trim().parse().unwrap_or(self.alarm_lead_minutes);
        }
        if let Some(value) = lookup("BATTLEFIELD_LOG_DIR") {
            self.log_dir = Some(value);
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_id_list(value: &str) -> Vec<i64> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(|item| item.parse().ok())
        .collect()
}
