use std::sync::Arc;

use tokio::sync::RwLock;
use watch_domain::ports::{BattlefieldSource, NotificationSink, SubscriberRepository};
use watch_domain::services::{AlertPolicy, MobList};
use watch_domain::{RewardTable, RuntimeConfig};

use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub source: Arc<dyn BattlefieldSource>,
    pub rewards: Arc<RewardTable>,
    /// Only the poll worker takes the write guard.
    pub mob_list: Arc<RwLock<MobList>>,
    pub sinks: Vec<Arc<dyn NotificationSink>>,
    pub subscriber_repo: Arc<dyn SubscriberRepository>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn alert_policy(&self) -> AlertPolicy {
        AlertPolicy::from_config(&self.config)
    }
}
