use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use watch_domain::{Subscriber, SubscriberRepository};

/// Newline-delimited `id,displayName` records. Writes are serialised so
/// concurrent subscribe/unsubscribe commands never interleave.
pub struct SubscriberFileRepository {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SubscriberFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> anyhow::Result<Vec<Subscriber>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(content.lines().filter_map(Subscriber::parse_line).collect())
    }

    async fn ensure_parent(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriberRepository for SubscriberFileRepository {
    async fn list(&self) -> anyhow::Result<Vec<Subscriber>> {
        self.read_all().await
    }

    async fn add(&self, subscriber: &Subscriber) -> anyhow::Result<bool> {
        let _guard = self.write_lock.lock().await;
        let existing = self.read_all().await?;
        if existing.iter().any(|entry| entry.chat_id == subscriber.chat_id) {
            return Ok(false);
        }
        self.ensure_parent().await?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", subscriber.to_line()).as_bytes())
            .await?;
        file.flush().await?;
        Ok(true)
    }

    async fn remove(&self, chat_id: i64) -> anyhow::Result<bool> {
        let _guard = self.write_lock.lock().await;
        let existing = self.read_all().await?;
        let kept: Vec<&Subscriber> = existing
            .iter()
            .filter(|entry| entry.chat_id != chat_id)
            .collect();
        if kept.len() == existing.len() {
            return Ok(false);
        }
        let content: String = kept
            .iter()
            .map(|entry| format!("{}\n", entry.to_line()))
            .collect();
        fs::write(&self.path, content).await?;
        Ok(true)
    }
}
