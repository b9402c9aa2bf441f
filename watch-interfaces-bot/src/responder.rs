use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use watch_application::commands::bot_commands::{handle_message, BotSession};
use watch_application::AppState;
use watch_domain::{ChatGateway, ChatMessage, TextFormat};

use crate::alarms::AlarmScheduler;
use crate::error::error_reply;

const RECONNECT_DELAY_SECONDS: u64 = 5;
const ALARM_REPLACED_SUFFIX: &str = " Old one was removed.";

/// Long-polls the chat gateway and answers commands until `shutdown` fires.
/// Pending alarms are dropped on exit.
pub async fn run_command_responder(
    state: AppState,
    gateway: Arc<dyn ChatGateway>,
    shutdown: CancellationToken,
) {
    let mut session = BotSession::default();
    let mut alarms = AlarmScheduler::new(gateway.clone(), shutdown.child_token());
    let mut offset = None;
    info!("command responder started");

    loop {
        let polled = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            polled = gateway.poll_updates(offset) => polled,
        };
        match polled {
            Ok(updates) => {
                if let Some(next) = updates.next_offset {
                    offset = Some(next);
                }
                for message in &updates.messages {
                    if shutdown.is_cancelled() {
                        break;
                    }
                    respond(&state, gateway.as_ref(), &mut session, &mut alarms, message).await;
                }
            }
            Err(err) => {
                warn!("chat poll failed, retrying in {}s: {}", RECONNECT_DELAY_SECONDS, err);
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = sleep(Duration::from_secs(RECONNECT_DELAY_SECONDS)) => {}
                }
            }
        }
    }

    alarms.cancel_all();
    info!("command responder stopped");
}

async fn respond(
    state: &AppState,
    gateway: &dyn ChatGateway,
    session: &mut BotSession,
    alarms: &mut AlarmScheduler,
    message: &ChatMessage,
) {
    let (chat_id, text, format) = match handle_message(state, session, message).await {
        Ok(Some(reply)) => {
            let mut text = reply.text;
            if let Some(alarm) = reply.alarm {
                if alarms.schedule(alarm) {
                    text.push_str(ALARM_REPLACED_SUFFIX);
                }
            }
            (reply.chat_id, text, reply.format)
        }
        Ok(None) => return,
        Err(err) => {
            warn!(chat_id = message.chat_id, "command failed: {}", err);
            (message.chat_id, error_reply(&err), TextFormat::Plain)
        }
    };

    if let Err(err) = gateway.send_message(chat_id, &text, format).await {
        warn!(chat_id, "reply delivery failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::SecondsFormat;
    use tokio::sync::RwLock;

    use watch_application::commands::bot_commands::{AlarmRequest, NO_MOBS_REPLY};
    use watch_application::Metrics;
    use watch_domain::services::clock;
    use watch_domain::{
        BattlefieldSource, ChatUpdates, Mob, MobList, RegionsPayload, Region, RewardTable,
        RuntimeConfig, Subscriber, SubscriberRepository,
    };

    type Sent = (i64, String, TextFormat);

    /// Plays back scripted update batches, then cancels the responder.
    struct ScriptedGateway {
        batches: Mutex<VecDeque<anyhow::Result<ChatUpdates>>>,
        offsets: Mutex<Vec<Option<i64>>>,
        sent: Mutex<Vec<Sent>>,
        shutdown: CancellationToken,
    }

    impl ScriptedGateway {
        fn new(batches: Vec<anyhow::Result<ChatUpdates>>, shutdown: CancellationToken) -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(batches.into()),
                offsets: Mutex::new(Vec::new()),
                sent: Mutex::new(Vec::new()),
                shutdown,
            })
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().expect("sent lock").clone()
        }
    }

    #[async_trait]
    impl ChatGateway for ScriptedGateway {
        async fn poll_updates(&self, offset: Option<i64>) -> anyhow::Result<ChatUpdates> {
            self.offsets.lock().expect("offsets lock").push(offset);
            let next = self.batches.lock().expect("batches lock").pop_front();
            match next {
                Some(batch) => batch,
                None => {
                    self.shutdown.cancel();
                    Ok(ChatUpdates::default())
                }
            }
        }

        async fn send_message(&self, chat_id: i64, text: &str, format: TextFormat) -> anyhow::Result<()> {
            self.sent
                .lock()
                .expect("sent lock")
                .push((chat_id, text.to_string(), format));
            Ok(())
        }
    }

    struct IdleSource;

    #[async_trait]
    impl BattlefieldSource for IdleSource {
        async fn fetch_regions(&self) -> anyhow::Result<RegionsPayload> {
            Ok(RegionsPayload::default())
        }
    }

    #[derive(Default)]
    struct MemorySubscribers {
        entries: Mutex<Vec<Subscriber>>,
    }

    #[async_trait]
    impl SubscriberRepository for MemorySubscribers {
        async fn list(&self) -> anyhow::Result<Vec<Subscriber>> {
            Ok(self.entries.lock().expect("entries lock").clone())
        }

        async fn add(&self, subscriber: &Subscriber) -> anyhow::Result<bool> {
            let mut entries = self.entries.lock().expect("entries lock");
            if entries.iter().any(|entry| entry.chat_id == subscriber.chat_id) {
                return Ok(false);
            }
            entries.push(subscriber.clone());
            Ok(true)
        }

        async fn remove(&self, chat_id: i64) -> anyhow::Result<bool> {
            let mut entries = self.entries.lock().expect("entries lock");
            let before = entries.len();
            entries.retain(|entry| entry.chat_id != chat_id);
            Ok(entries.len() != before)
        }
    }

    fn despawn_in(minutes: i64) -> String {
        (chrono::Utc::now() + chrono::Duration::minutes(minutes))
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn state_with(mobs: Vec<Mob>) -> AppState {
        let mut list = MobList::new();
        list.update_at(mobs, clock::now_in_zone());
        AppState {
            config: RuntimeConfig::default(),
            source: Arc::new(IdleSource),
            rewards: Arc::new(RewardTable::default()),
            mob_list: Arc::new(RwLock::new(list)),
            sinks: Vec::new(),
            subscriber_repo: Arc::new(MemorySubscribers::default()),
            metrics: Arc::new(Metrics::default()),
        }
    }

    fn message(update_id: i64, chat_id: i64, text: &str) -> ChatMessage {
        ChatMessage {
            update_id,
            chat_id,
            user_id: Some(chat_id),
            username: Some("tester".to_string()),
            text: text.to_string(),
        }
    }

    fn batch(messages: Vec<ChatMessage>) -> anyhow::Result<ChatUpdates> {
        let next_offset = messages.iter().map(|message| message.update_id + 1).max();
        Ok(ChatUpdates {
            messages,
            next_offset,
        })
    }

    #[tokio::test]
    async fn answers_commands_and_acknowledges_offsets() {
        let shutdown = CancellationToken::new();
        let gateway = ScriptedGateway::new(
            vec![
                batch(vec![message(10, 5, "/mobs"), message(11, 5, "just chatting")]),
                batch(vec![message(12, 5, "/subscribe"), message(13, 5, "/subscribe")]),
            ],
            shutdown.clone(),
        );

        run_command_responder(state_with(Vec::new()), gateway.clone(), shutdown).await;

        let replies: Vec<String> = gateway.sent().into_iter().map(|(_, text, _)| text).collect();
        assert_eq!(
            replies,
            vec![
                NO_MOBS_REPLY.to_string(),
                "You've been subscribed successfully!".to_string(),
                "You're already subscribed.".to_string(),
            ]
        );
        let offsets = gateway.offsets.lock().expect("offsets lock").clone();
        assert_eq!(offsets, vec![None, Some(12), Some(14)]);
    }

    #[tokio::test]
    async fn second_alarm_replaces_the_first() {
        let shutdown = CancellationToken::new();
        let mobs = vec![Mob {
            id: 900,
            region: Region::Wolf,
            level: 4,
            despawn_time: despawn_in(90),
            reward_group_id: 1,
        }];
        let gateway = ScriptedGateway::new(
            vec![batch(vec![
                message(1, 8, "/mobs"),
                message(2, 8, "/setalarm 1"),
                message(3, 8, "/setalarm 1"),
                message(4, 9, "/setalarm 1"),
                message(5, 8, "/setalarm"),
            ])],
            shutdown.clone(),
        );

        run_command_responder(state_with(mobs), gateway.clone(), shutdown).await;

        let sent = gateway.sent();
        assert_eq!(sent.len(), 5);
        assert_eq!(sent[0].2, TextFormat::Html);
        assert!(sent[0].1.starts_with("<b>Mob Information:</b>\n<pre>"));
        assert_eq!(sent[1].1, "Alarm successfully set!");
        assert_eq!(sent[2].1, "Alarm successfully set! Old one was removed.");
        // Chat 9 never listed mobs, so index 1 means nothing there.
        assert_eq!(sent[3], (9, "Invalid mob ID.".to_string(), TextFormat::Plain));
        assert_eq!(sent[4].1, "Usage: /setalarm <simple_id>");
    }

    #[tokio::test]
    async fn poll_errors_back_off_until_shutdown() {
        let shutdown = CancellationToken::new();
        let gateway = ScriptedGateway::new(
            vec![Err(anyhow::anyhow!("network unreachable"))],
            shutdown.clone(),
        );
        let stopper = shutdown.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        });

        let started = std::time::Instant::now();
        run_command_responder(state_with(Vec::new()), gateway.clone(), shutdown).await;
        assert!(started.elapsed() < Duration::from_secs(RECONNECT_DELAY_SECONDS));
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn due_alarm_fires_and_shutdown_drops_pending_ones() {
        let shutdown = CancellationToken::new();
        let gateway = ScriptedGateway::new(Vec::new(), shutdown.clone());
        let mut alarms = AlarmScheduler::new(gateway.clone(), shutdown.child_token());

        assert!(!alarms.schedule(AlarmRequest {
            chat_id: 1,
            delay: Duration::ZERO,
            message: "Beep! 12 minutes left for mob ID 1!".to_string(),
        }));
        assert!(!alarms.schedule(AlarmRequest {
            chat_id: 2,
            delay: Duration::from_secs(3600),
            message: "never".to_string(),
        }));
        sleep(Duration::from_millis(50)).await;

        assert_eq!(
            gateway.sent(),
            vec![(1, "Beep! 12 minutes left for mob ID 1!".to_string(), TextFormat::Plain)]
        );
        assert_eq!(alarms.pending_count(), 1);
        shutdown.cancel();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(alarms.pending_count(), 0);
    }
}
