// Clock utility
// All display and threshold arithmetic happens in one fixed zone (Asia/Singapore, UTC+8, no DST).

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

use crate::error::DomainError;

pub const TARGET_UTC_OFFSET_SECONDS: i32 = 8 * 3600;

const SECONDS_PER_DAY: i64 = 86_400;
const MINUTES_PER_DAY: i64 = 1_440;
const DATE_LEN: usize = "YYYY-MM-DD".len();

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

pub fn target_zone() -> FixedOffset {
    FixedOffset::east_opt(TARGET_UTC_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

pub fn now_in_zone() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&target_zone())
}

/// Parses a server timestamp and expresses it in the target zone.
///
/// Server times are always UTC. A trailing zone marker (`Z` or a numeric
/// offset such as `+05:00`) is ignored rather than applied.
pub fn convert_to_zone(raw: &str) -> Result<DateTime<FixedOffset>, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::parse(raw, "empty timestamp"));
    }

    let naive_text = strip_zone_suffix(trimmed);
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(naive_text, format).ok())
        .ok_or_else(|| DomainError::parse(raw, "expected ISO-8601 date-time"))?;
    Ok(Utc.from_utc_datetime(&naive).with_timezone(&target_zone()))
}

fn strip_zone_suffix(value: &str) -> &str {
    if let Some(marker) = value.chars().last() {
        if marker.is_ascii_alphabetic() {
            return &value[..value.len() - 1];
        }
    }
    // Offsets can only follow the time part; the date's own dashes end at byte 10.
    let Some(time_part) = value.get(DATE_LEN..) else {
        return value;
    };
    match time_part.rfind(['+', '-']) {
        Some(sign) => {
            let offset = &time_part[sign + 1..];
            let is_offset = (2..=5).contains(&offset.len())
                && offset.bytes().all(|byte| byte.is_ascii_digit() || byte == b':');
            if is_offset {
                &value[..DATE_LEN + sign]
            } else {
                value
            }
        }
        None => value,
    }
}

pub fn time_until(target: DateTime<FixedOffset>) -> Duration {
    time_between(now_in_zone(), target)
}

pub fn time_between(now: DateTime<FixedOffset>, target: DateTime<FixedOffset>) -> Duration {
    target.signed_duration_since(now)
}

/// Splits into whole days (floored) and a non-negative seconds-of-day remainder.
pub fn split_days(duration: Duration) -> (i64, i64) {
    let total_seconds = duration.num_milliseconds().div_euclid(1000);
    (
        total_seconds.div_euclid(SECONDS_PER_DAY),
        total_seconds.rem_euclid(SECONDS_PER_DAY),
    )
}

/// Hours and minutes of the seconds-of-day remainder only; whole days are not shown.
pub fn format_duration_human(duration: Duration) -> String {
    let (_, seconds_of_day) = split_days(duration);
    let hours = seconds_of_day / 3600;
    let minutes = (seconds_of_day % 3600) / 60;
    if hours > 0 {
        format!("{} hrs {} min", hours, minutes)
    } else {
        format!("{} min", minutes)
    }
}

pub fn total_minutes(duration: Duration) -> i64 {
    let (days, seconds_of_day) = split_days(duration);
    seconds_of_day / 60 + days * MINUTES_PER_DAY
}

pub fn format_despawn(at: &DateTime<FixedOffset>) -> String {
    at.format("%m-%d %H:%M:%S").to_string()
}

pub fn format_clock(at: &DateTime<FixedOffset>) -> String {
    at.format("%H:%M:%S").to_string()
}
