use std::collections::HashMap;
use std::time::Duration;

use tracing::info;
use watch_domain::services::clock;
use watch_domain::{ChatMessage, Subscriber, TextFormat};

use crate::queries::mob_queries::{self, AlarmDue};
use crate::{AppError, AppState};

pub const NO_MOBS_REPLY: &str = "No mobs available.";
pub const ALARM_USAGE_REPLY: &str = "Usage: /setalarm <simple_id>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Mobs,
    Subscribe,
    Unsubscribe,
    SetAlarm(Option<String>),
}

/// Recognises `/command` and `/command@botname`, ignoring anything else.
pub fn parse_command(text: &str) -> Option<BotCommand> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
    match name.as_str() {
        "mobs" => Some(BotCommand::Mobs),
        "subscribe" => Some(BotCommand::Subscribe),
        "unsubscribe" => Some(BotCommand::Unsubscribe),
        "setalarm" => Some(BotCommand::SetAlarm(parts.next().map(ToString::to_string))),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmRequest {
    pub chat_id: i64,
    pub delay: Duration,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub chat_id: i64,
    pub text: String,
    pub format: TextFormat,
    /// Set when the command asks the responder to schedule a one-shot reminder.
    pub alarm: Option<AlarmRequest>,
}

impl BotReply {
    fn plain(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            format: TextFormat::Plain,
            alarm: None,
        }
    }
}

/// Per-responder memory of the last `/mobs` listing in each chat.
#[derive(Debug, Default)]
pub struct BotSession {
    listings: HashMap<i64, HashMap<usize, i64>>,
}

impl BotSession {
    pub fn remember_listing(&mut self, chat_id: i64, index: &[(usize, i64)]) {
        self.listings
            .insert(chat_id, index.iter().copied().collect());
    }

    pub fn resolve(&self, chat_id: i64, simple_id: usize) -> Option<i64> {
        self.listings.get(&chat_id)?.get(&simple_id).copied()
    }
}

pub async fn handle_message(
    state: &AppState,
    session: &mut BotSession,
    message: &ChatMessage,
) -> Result<Option<BotReply>, AppError> {
    let Some(command) = parse_command(&message.text) else {
        return Ok(None);
    };
    info!(
        chat_id = message.chat_id,
        user_id = ?message.user_id,
        username = message.username.as_deref().unwrap_or("<none>"),
        command = ?command,
        "bot command received"
    );

    let reply = match command {
        BotCommand::Mobs => list_mobs(state, session, message.chat_id).await,
        BotCommand::Subscribe => subscribe(state, message).await?,
        BotCommand::Unsubscribe => unsubscribe(state, message).await?,
        BotCommand::SetAlarm(arg) => set_alarm(state, session, message.chat_id, arg.as_deref()).await,
    };
    Ok(Some(reply))
}

async fn list_mobs(state: &AppState, session: &mut BotSession, chat_id: i64) -> BotReply {
    let snapshot = mob_queries::current_snapshot(state).await;
    let now = clock::now_in_zone();
    let Some(view) = mob_queries::build_chat_mob_view(&snapshot, &state.rewards, now) else {
        return BotReply::plain(chat_id, NO_MOBS_REPLY);
    };
    session.remember_listing(chat_id, &view.index);
    BotReply {
        chat_id,
        text: format!(
            "<b>Mob Information:</b>\n<pre>{}</pre>\n<b>Prizes:</b>\n<pre>{}</pre>",
            escape_html(&view.mob_table),
            escape_html(&view.prize_table)
        ),
        format: TextFormat::Html,
        alarm: None,
    }
}

async fn subscribe(state: &AppState, message: &ChatMessage) -> Result<BotReply, AppError> {
    let subscriber = Subscriber::new(message.sender_id(), message.username.as_deref());
    let added = state.subscriber_repo.add(&subscriber).await?;
    if added {
        info!(chat_id = subscriber.chat_id, name = %subscriber.display_name, "subscriber added");
        Ok(BotReply::plain(message.chat_id, "You've been subscribed successfully!"))
    } else {
        Ok(BotReply::plain(message.chat_id, "You're already subscribed."))
    }
}

async fn unsubscribe(state: &AppState, message: &ChatMessage) -> Result<BotReply, AppError> {
    let subscriber_id = message.sender_id();
    if state.subscriber_repo.remove(subscriber_id).await? {
        info!(subscriber_id, "subscriber removed");
        Ok(BotReply::plain(message.chat_id, "You've been unsubscribed."))
    } else {
        Ok(BotReply::plain(message.chat_id, "You were not subscribed."))
    }
}

async fn set_alarm(
    state: &AppState,
    session: &BotSession,
    chat_id: i64,
    arg: Option<&str>,
) -> BotReply {
    let Some(simple_id) = arg.and_then(|raw| raw.trim().parse::<usize>().ok()) else {
        return BotReply::plain(chat_id, ALARM_USAGE_REPLY);
    };
    let Some(mob_id) = session.resolve(chat_id, simple_id) else {
        return BotReply::plain(chat_id, "Invalid mob ID.");
    };

    let snapshot = mob_queries::current_snapshot(state).await;
    let lead = state.config.alarm_lead_minutes;
    match mob_queries::alarm_due(&snapshot, mob_id, lead, clock::now_in_zone()) {
        AlarmDue::In(delay) => BotReply {
            chat_id,
            text: "Alarm successfully set!".to_string(),
            format: TextFormat::Plain,
            alarm: Some(AlarmRequest {
                chat_id,
                delay,
                message: format!("Beep! {} minutes left for mob ID {}!", lead, simple_id),
            }),
        },
        AlarmDue::Missing | AlarmDue::Expired => {
            BotReply::plain(chat_id, "Invalid mob ID or mob already expired.")
        }
    }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_supports_bot_suffix_and_args() {
        assert_eq!(parse_command("/mobs"), Some(BotCommand::Mobs));
        assert_eq!(parse_command("/MOBS@watch_bot"), Some(BotCommand::Mobs));
        assert_eq!(parse_command("  /subscribe "), Some(BotCommand::Subscribe));
        assert_eq!(parse_command("/unsubscribe"), Some(BotCommand::Unsubscribe));
        assert_eq!(
            parse_command("/setalarm 3"),
            Some(BotCommand::SetAlarm(Some("3".to_string())))
        );
        assert_eq!(parse_command("/setalarm"), Some(BotCommand::SetAlarm(None)));
    }

    #[test]
    fn parse_command_ignores_chatter() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/unknown"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn session_resolves_per_chat_listings() {
        let mut session = BotSession::default();
        session.remember_listing(1, &[(1, 500), (2, 501)]);
        session.remember_listing(2, &[(1, 900)]);
        assert_eq!(session.resolve(1, 2), Some(501));
        assert_eq!(session.resolve(2, 1), Some(900));
        assert_eq!(session.resolve(2, 2), None);
        assert_eq!(session.resolve(3, 1), None);
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
    }
}
