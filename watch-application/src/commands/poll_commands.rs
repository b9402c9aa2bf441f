use chrono::{DateTime, FixedOffset};
use tracing::{debug, info, warn};
use watch_domain::ports::SinkKind;
use watch_domain::services::{clock, AlertDecision, AlertEvaluator};
use watch_domain::Mob;

use crate::queries::mob_queries;
use crate::{AppError, AppState};

#[derive(Debug, Clone, Default)]
pub struct PollReport {
    pub mob_count: usize,
    pub new_mob_ids: Vec<i64>,
    pub alerts_sent: usize,
    pub notices_sent: usize,
}

/// Fetch, diff, print and alert. Runs once per poll interval.
pub async fn run_poll_cycle(state: &AppState) -> Result<PollReport, AppError> {
    state.metrics.record_poll();
    let payload = state
        .source
        .fetch_regions()
        .await
        .map_err(AppError::from_port)?;
    ingest_snapshot(state, payload.into_mobs(), clock::now_in_zone()).await
}

pub async fn ingest_snapshot(
    state: &AppState,
    mobs: Vec<Mob>,
    now: DateTime<FixedOffset>,
) -> Result<PollReport, AppError> {
    let mob_count = mobs.len();
    let (snapshot, new_mobs) = {
        let mut list = state.mob_list.write().await;
        list.update_at(mobs, now);
        (list.current(), list.new_mobs())
    };
    state.metrics.record_snapshot(mob_count, new_mobs.len());
    debug!(mob_count, new_count = new_mobs.len(), "snapshot stored");

    let table = mob_queries::render_console_table(&snapshot, &state.rewards, now);
    deliver_console(state, &table).await;

    let policy = state.alert_policy();
    let outcome = AlertEvaluator::new(&policy, &state.rewards).evaluate(&new_mobs, now);
    let dispatched = match outcome {
        Ok(decisions) => Ok(dispatch_decisions(state, &decisions).await),
        Err(err) => Err(err),
    };
    deliver_console(state, &mob_queries::render_last_updated(&snapshot)).await;
    let (alerts_sent, notices_sent) = dispatched?;

    if alerts_sent > 0 {
        info!(alerts_sent, "mob alerts dispatched");
    }
    Ok(PollReport {
        mob_count,
        new_mob_ids: new_mobs.iter().map(|mob| mob.id).collect(),
        alerts_sent,
        notices_sent,
    })
}

/// Alerts go to every sink; notices only to the console. Chat sinks are
/// skipped entirely while chat alerting is disabled.
pub async fn dispatch_decisions(state: &AppState, decisions: &[AlertDecision]) -> (usize, usize) {
    let mut alerts_sent = 0;
    let mut notices_sent = 0;
    for decision in decisions {
        for sink in &state.sinks {
            let kind = sink.kind();
            if kind == SinkKind::Chat && (!decision.is_alert() || !state.config.chat_alerts_enabled) {
                continue;
            }
            match sink.deliver(decision.message()).await {
                Ok(report) => {
                    if report.failed > 0 {
                        state.metrics.record_sink_failures(report.failed);
                    }
                }
                Err(err) => {
                    state.metrics.record_sink_failures(1);
                    warn!(mob_id = decision.mob_id(), sink = ?kind, "alert delivery failed: {}", err);
                }
            }
        }
        if decision.is_alert() {
            state.metrics.record_alert();
            alerts_sent += 1;
        } else {
            state.metrics.record_notice();
            notices_sent += 1;
        }
    }
    (alerts_sent, notices_sent)
}

async fn deliver_console(state: &AppState, text: &str) {
    for sink in state.sinks.iter().filter(|sink| sink.kind() == SinkKind::Console) {
        if let Err(err) = sink.deliver(text).await {
            warn!("console output failed: {}", err);
        }
    }
}
