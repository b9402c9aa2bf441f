use chrono::{DateTime, Duration, FixedOffset};
use watch_domain::services::clock;
use watch_domain::{MobSnapshot, RewardTable};

use crate::table::TextTable;
use crate::AppState;

const UNKNOWN_CELL: &str = "?";

/// Console table of the whole current snapshot.
pub fn render_console_table(
    snapshot: &MobSnapshot,
    rewards: &RewardTable,
    now: DateTime<FixedOffset>,
) -> String {
    let mut table = TextTable::new([
        "ID",
        "Region",
        "Level",
        "Despawn Time",
        "Time Left",
        "RewardID",
        "1st Prize",
    ]);
    for mob in &snapshot.mobs {
        let (despawn, left) = match clock::convert_to_zone(&mob.despawn_time) {
            Ok(local) => (
                clock::format_despawn(&local),
                clock::format_duration_human(clock::time_between(now, local)),
            ),
            Err(_) => (mob.despawn_time.clone(), UNKNOWN_CELL.to_string()),
        };
        table.add_row([
            mob.id.to_string(),
            mob.region.to_string(),
            mob.level.to_string(),
            despawn,
            left,
            mob.reward_group_id.to_string(),
            rewards.first_place_prize(mob.reward_group_id),
        ]);
    }
    table.render()
}

pub fn render_last_updated(snapshot: &MobSnapshot) -> String {
    let label = snapshot
        .last_updated
        .as_ref()
        .map(clock::format_clock)
        .unwrap_or_else(|| "never".to_string());
    format!("Last Updated: {}", label)
}

/// Compact tables sized for a chat window, plus the 1-based index used by `/setalarm`.
#[derive(Debug, Clone, Default)]
pub struct ChatMobView {
    pub mob_table: String,
    pub prize_table: String,
    pub index: Vec<(usize, i64)>,
}

pub fn build_chat_mob_view(
    snapshot: &MobSnapshot,
    rewards: &RewardTable,
    now: DateTime<FixedOffset>,
) -> Option<ChatMobView> {
    if snapshot.mobs.is_empty() {
        return None;
    }

    let mut mob_table = TextTable::new(["#", "Reg", "Lv", "DeTime", "T Left"]);
    let mut prize_table = TextTable::new(["Reg", "Lv", "First Prize"]);
    let mut index = Vec::with_capacity(snapshot.mobs.len());

    for (position, mob) in snapshot.mobs.iter().enumerate() {
        let simple_id = position + 1;
        let (despawn, left) = match clock::convert_to_zone(&mob.despawn_time) {
            Ok(local) => (
                clock::format_clock(&local),
                clock::format_duration_human(clock::time_between(now, local)),
            ),
            Err(_) => (UNKNOWN_CELL.to_string(), UNKNOWN_CELL.to_string()),
        };
        mob_table.add_row([
            simple_id.to_string(),
            mob.region.to_string(),
            mob.level.to_string(),
            despawn,
            left,
        ]);

        let prize = rewards.first_place_prize(mob.reward_group_id);
        let mut components = prize.split(',').map(str::trim);
        let first = components.next().unwrap_or_default();
        prize_table.add_row([mob.region.to_string(), mob.level.to_string(), first.to_string()]);
        for component in components {
            prize_table.add_row([String::new(), String::new(), component.to_string()]);
        }

        index.push((simple_id, mob.id));
    }

    Some(ChatMobView {
        mob_table: mob_table.render(),
        prize_table: prize_table.render(),
        index,
    })
}

/// Outcome of resolving a `/setalarm` target against the live snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmDue {
    /// Fire after this long (already clamped at zero).
    In(std::time::Duration),
    Missing,
    Expired,
}

pub fn alarm_due(
    snapshot: &MobSnapshot,
    mob_id: i64,
    lead_minutes: i64,
    now: DateTime<FixedOffset>,
) -> AlarmDue {
    let Some(mob) = snapshot.mobs.iter().find(|mob| mob.id == mob_id) else {
        return AlarmDue::Missing;
    };
    let Ok(despawn) = clock::convert_to_zone(&mob.despawn_time) else {
        return AlarmDue::Missing;
    };
    let left = clock::time_between(now, despawn);
    if left < Duration::zero() {
        return AlarmDue::Expired;
    }
    let due = left - Duration::minutes(lead_minutes);
    AlarmDue::In(due.to_std().unwrap_or_default())
}

pub async fn current_snapshot(state: &AppState) -> MobSnapshot {
    state.mob_list.read().await.current()
}
