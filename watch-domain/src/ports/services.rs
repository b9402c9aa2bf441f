use async_trait::async_trait;

use crate::entities::{ChatUpdates, RegionsPayload, TextFormat};

#[async_trait]
pub trait BattlefieldSource: Send + Sync {
    /// One authenticated request per call. Authorization failures surface as
    /// `DomainError::Auth` inside the returned `anyhow::Error`.
    async fn fetch_regions(&self) -> anyhow::Result<RegionsPayload>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Console,
    Chat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn kind(&self) -> SinkKind;
    async fn deliver(&self, message: &str) -> anyhow::Result<DeliveryReport>;
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn poll_updates(&self, offset: Option<i64>) -> anyhow::Result<ChatUpdates>;
    async fn send_message(&self, chat_id: i64, text: &str, format: TextFormat) -> anyhow::Result<()>;
}
