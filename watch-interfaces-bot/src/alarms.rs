use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use watch_application::commands::bot_commands::AlarmRequest;
use watch_domain::{ChatGateway, TextFormat};

/// One pending reminder per chat. Scheduling again replaces the previous one.
pub struct AlarmScheduler {
    gateway: Arc<dyn ChatGateway>,
    shutdown: CancellationToken,
    pending: HashMap<i64, JoinHandle<()>>,
}

impl AlarmScheduler {
    pub fn new(gateway: Arc<dyn ChatGateway>, shutdown: CancellationToken) -> Self {
        Self {
            gateway,
            shutdown,
            pending: HashMap::new(),
        }
    }

    /// Returns true when a still-pending alarm for the chat was dropped.
    pub fn schedule(&mut self, request: AlarmRequest) -> bool {
        let chat_id = request.chat_id;
        let replaced = match self.pending.remove(&chat_id) {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        };

        let gateway = self.gateway.clone();
        let shutdown = self.shutdown.clone();
        info!(chat_id, delay_seconds = request.delay.as_secs(), "alarm scheduled");
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = sleep(request.delay) => {
                    if let Err(err) = gateway
                        .send_message(request.chat_id, &request.message, TextFormat::Plain)
                        .await
                    {
                        warn!(chat_id = request.chat_id, "alarm delivery failed: {}", err);
                    }
                }
            }
        });
        self.pending.insert(chat_id, handle);
        replaced
    }

    pub fn pending_count(&self) -> usize {
        self.pending
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

impl Drop for AlarmScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
