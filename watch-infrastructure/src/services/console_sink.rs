use async_trait::async_trait;

use watch_domain::{DeliveryReport, NotificationSink, SinkKind};

/// Writes user-facing text to stdout. Never fails.
#[derive(Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    fn kind(&self) -> SinkKind {
        SinkKind::Console
    }

    async fn deliver(&self, message: &str) -> anyhow::Result<DeliveryReport> {
        println!("{}", message);
        Ok(DeliveryReport {
            delivered: 1,
            failed: 0,
        })
    }
}
