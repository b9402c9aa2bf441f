use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use watch_application::commands::poll_commands::run_poll_cycle;
use watch_application::AppState;

/// Polls immediately, then once per interval until cancelled. Only fatal
/// errors (rejected credentials) end the loop early; a cycle that fails
/// because shutdown interrupted it (e.g. a pending token prompt) is a clean stop.
pub async fn schedule_polls(state: AppState, shutdown: CancellationToken) -> Result<()> {
    let interval = Duration::from_secs(state.config.poll_interval_seconds.max(1));
    info!(interval_seconds = interval.as_secs(), "poll worker started");

    while !shutdown.is_cancelled() {
        match run_poll_cycle(&state).await {
            Ok(report) => {
                if !report.new_mob_ids.is_empty() {
                    info!(
                        mob_count = report.mob_count,
                        new_mobs = ?report.new_mob_ids,
                        alerts = report.alerts_sent,
                        "poll cycle complete"
                    );
                }
            }
            Err(err) if shutdown.is_cancelled() => {
                info!("poll cycle interrupted by shutdown: {}", err);
                break;
            }
            Err(err) if err.is_fatal() => {
                error!("poll worker stopping: {}", err);
                return Err(err.into());
            }
            Err(err) => {
                state.metrics.record_poll_failure();
                warn!("poll cycle failed: {}", err);
            }
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("poll worker stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::RwLock;

    use watch_application::Metrics;
    use watch_domain::{
        BattlefieldSource, DomainError, MobList, RegionsPayload, RewardTable, RuntimeConfig,
        Subscriber, SubscriberRepository,
    };

    /// Fails every call with the configured error and cancels after `cancel_after` calls.
    struct FailingSource {
        auth: bool,
        calls: AtomicUsize,
        cancel_after: usize,
        shutdown: CancellationToken,
    }

    #[async_trait]
    impl BattlefieldSource for FailingSource {
        async fn fetch_regions(&self) -> Result<RegionsPayload> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if calls >= self.cancel_after {
                self.shutdown.cancel();
            }
            if self.auth {
                Err(DomainError::Auth("403 Forbidden".to_string()).into())
            } else {
                Err(anyhow::anyhow!("connection reset"))
            }
        }
    }

    struct NoSubscribers;

    #[async_trait]
    impl SubscriberRepository for NoSubscribers {
        async fn list(&self) -> Result<Vec<Subscriber>> {
            Ok(Vec::new())
        }

        async fn add(&self, _subscriber: &Subscriber) -> Result<bool> {
            Ok(true)
        }

        async fn remove(&self, _chat_id: i64) -> Result<bool> {
            Ok(false)
        }
    }

    fn state(source: Arc<FailingSource>) -> AppState {
        AppState {
            config: RuntimeConfig::default(),
            source,
            rewards: Arc::new(RewardTable::default()),
            mob_list: Arc::new(RwLock::new(MobList::new())),
            sinks: Vec::new(),
            subscriber_repo: Arc::new(NoSubscribers),
            metrics: Arc::new(Metrics::default()),
        }
    }

    #[tokio::test]
    async fn transient_failures_are_counted_and_loop_honours_cancellation() {
        let shutdown = CancellationToken::new();
        let source = Arc::new(FailingSource {
            auth: false,
            calls: AtomicUsize::new(0),
            cancel_after: 1,
            shutdown: shutdown.clone(),
        });
        let state = state(source.clone());

        schedule_polls(state.clone(), shutdown).await.expect("clean stop");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.metrics.polls(), 1);
        assert_eq!(state.metrics.poll_failures(), 1);
    }

    #[tokio::test]
    async fn auth_failure_stops_the_worker() {
        let shutdown = CancellationToken::new();
        let source = Arc::new(FailingSource {
            auth: true,
            calls: AtomicUsize::new(0),
            cancel_after: usize::MAX,
            shutdown: shutdown.clone(),
        });
        let state = state(source.clone());

        let err = schedule_polls(state.clone(), shutdown.clone())
            .await
            .expect_err("fatal");
        assert!(err.to_string().contains("403"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.metrics.poll_failures(), 0);
        assert!(!shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn failure_caused_by_shutdown_is_a_clean_stop() {
        let shutdown = CancellationToken::new();
        let source = Arc::new(FailingSource {
            auth: true,
            calls: AtomicUsize::new(0),
            cancel_after: 1,
            shutdown: shutdown.clone(),
        });
        let state = state(source.clone());

        schedule_polls(state.clone(), shutdown).await.expect("clean stop");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.metrics.poll_failures(), 0);
    }

    #[tokio::test]
    async fn cancelled_before_start_never_polls() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let source = Arc::new(FailingSource {
            auth: false,
            calls: AtomicUsize::new(0),
            cancel_after: 1,
            shutdown: shutdown.clone(),
        });
        schedule_polls(state(source.clone()), shutdown)
            .await
            .expect("clean stop");
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
