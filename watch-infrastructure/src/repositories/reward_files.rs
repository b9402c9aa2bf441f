use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use watch_domain::{RewardRepository, RewardTable};

pub struct RewardFileRepository;

impl RewardFileRepository {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RewardFileRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RewardRepository for RewardFileRepository {
    /// A missing file leaves every prize lookup on the sentinel; a malformed one is an error.
    async fn load_rewards(&self, path: &str) -> anyhow::Result<RewardTable> {
        if !Path::new(path).exists() {
            warn!("reward table {} not found, prizes will show as unavailable", path);
            return Ok(RewardTable::default());
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("read reward table {}", path))?;
        let table = RewardTable::from_json(&content)
            .with_context(|| format!("parse reward table {}", path))?;
        info!(groups = table.len(), "reward table loaded");
        Ok(table)
    }
}
