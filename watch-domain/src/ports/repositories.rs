use async_trait::async_trait;

use crate::entities::{RewardTable, Subscriber};

#[async_trait]
pub trait RewardRepository: Send + Sync {
    async fn load_rewards(&self, path: &str) -> anyhow::Result<RewardTable>;
}

#[async_trait]
pub trait SubscriberRepository: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Subscriber>>;
    /// Appends unless the chat id is already present. Returns whether a line was written.
    async fn add(&self, subscriber: &Subscriber) -> anyhow::Result<bool>;
    /// Rewrites the list without `chat_id`. Returns whether anything was removed.
    async fn remove(&self, chat_id: i64) -> anyhow::Result<bool>;
}
