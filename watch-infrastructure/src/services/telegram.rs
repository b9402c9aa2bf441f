use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use watch_domain::{
    ChatGateway, ChatMessage, ChatUpdates, DeliveryReport, NotificationSink, SinkKind,
    SubscriberRepository, TextFormat,
};

use crate::config::AppConfig;

/// Seconds Telegram may hold a `getUpdates` call open.
pub const LONG_POLL_SECONDS: u64 = 25;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    chat: Chat,
    #[serde(default)]
    from: Option<User>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
    #[serde(default)]
    username: Option<String>,
}

/// Telegram Bot API over HTTPS.
pub struct TelegramClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TelegramClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let token = config
            .telegram_token
            .clone()
            .ok_or_else(|| anyhow!("telegram_token not configured"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(
                LONG_POLL_SECONDS + config.request_timeout_seconds.max(3),
            ))
            .build()?;
        Ok(Self {
            client,
            base_url: config.telegram_api_base_url.clone(),
            token,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    // reqwest errors carry the URL, which embeds the bot token.
    async fn call<T>(&self, method: &str, body: serde_json::Value) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|err| anyhow!("telegram {} failed: {}", method, err.without_url()))?;
        let status = response.status();
        let parsed = response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|err| anyhow!("telegram {} returned {}: {}", method, status, err.without_url()))?;
        if !parsed.ok {
            return Err(anyhow!(
                "telegram {} rejected ({}): {}",
                method,
                status,
                parsed.description.unwrap_or_default()
            ));
        }
        parsed
            .result
            .ok_or_else(|| anyhow!("telegram {} returned no result", method))
    }
}

#[async_trait]
impl ChatGateway for TelegramClient {
    async fn poll_updates(&self, offset: Option<i64>) -> Result<ChatUpdates> {
        let mut body = json!({
            "timeout": LONG_POLL_SECONDS,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        let updates: Vec<Update> = self.call("getUpdates", body).await?;

        let next_offset = updates.iter().map(|update| update.update_id + 1).max();
        let messages = updates
            .into_iter()
            .filter_map(|update| {
                let message = update.message?;
                let text = message.text?;
                Some(ChatMessage {
                    update_id: update.update_id,
                    chat_id: message.chat.id,
                    user_id: message.from.as_ref().map(|user| user.id),
                    username: message.from.and_then(|user| user.username),
                    text,
                })
            })
            .collect();
        Ok(ChatUpdates {
            messages,
            next_offset,
        })
    }

    async fn send_message(&self, chat_id: i64, text: &str, format: TextFormat) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if format == TextFormat::Html {
            body["parse_mode"] = json!("HTML");
        }
        let _: serde_json::Value = self.call("sendMessage", body).await?;
        Ok(())
    }
}

/// Broadcasts alerts to the configured chat plus every subscriber.
pub struct TelegramAlertSink {
    gateway: Arc<dyn ChatGateway>,
    chat_id: Option<i64>,
    subscribers: Arc<dyn SubscriberRepository>,
}

impl TelegramAlertSink {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        chat_id: Option<i64>,
        subscribers: Arc<dyn SubscriberRepository>,
    ) -> Self {
        Self {
            gateway,
            chat_id,
            subscribers,
        }
    }

    async fn recipients(&self) -> Vec<i64> {
        let mut recipients: Vec<i64> = self.chat_id.into_iter().collect();
        match self.subscribers.list().await {
            Ok(list) => {
                for subscriber in list {
                    if !recipients.contains(&subscriber.chat_id) {
                        recipients.push(subscriber.chat_id);
                    }
                }
            }
            Err(err) => warn!("subscriber list unavailable, alerting configured chat only: {}", err),
        }
        recipients
    }
}

#[async_trait]
impl NotificationSink for TelegramAlertSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Chat
    }

    async fn deliver(&self, message: &str) -> Result<DeliveryReport> {
        let mut report = DeliveryReport::default();
        for chat_id in self.recipients().await {
            match self
                .gateway
                .send_message(chat_id, message, TextFormat::Plain)
                .await
            {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(chat_id, "telegram alert failed: {}", err);
                }
            }
        }
        Ok(report)
    }
}
