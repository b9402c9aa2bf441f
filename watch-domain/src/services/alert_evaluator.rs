use std::collections::HashSet;

use chrono::{DateTime, Duration, FixedOffset};

use crate::entities::{Mob, RewardTable, RuntimeConfig, DEFAULT_MIN_MINUTES_LEFT};
use crate::error::DomainError;
use crate::services::clock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPolicy {
    /// Alert only when strictly fewer minutes than this remain.
    pub min_minutes_left: i64,
    /// Empty means every reward group qualifies.
    pub reward_filter: HashSet<i64>,
    pub verbose_on_ineligible: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            min_minutes_left: DEFAULT_MIN_MINUTES_LEFT,
            reward_filter: HashSet::new(),
            verbose_on_ineligible: false,
        }
    }
}

impl AlertPolicy {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            min_minutes_left: config.min_minutes_left,
            reward_filter: config.reward_filter.iter().copied().collect(),
            verbose_on_ineligible: config.verbose_on_ineligible,
        }
    }

    pub fn is_eligible(&self, minutes_left: i64, reward_group_id: i64) -> bool {
        minutes_left < self.min_minutes_left
            && (self.reward_filter.is_empty() || self.reward_filter.contains(&reward_group_id))
    }
}

/// Everything computed about one newly appeared mob.
#[derive(Debug, Clone)]
pub struct MobAssessment {
    pub mob: Mob,
    pub despawn_local: DateTime<FixedOffset>,
    pub time_left: Duration,
    pub minutes_left: i64,
    pub prize: String,
    pub eligible: bool,
}

impl MobAssessment {
    pub fn time_left_text(&self) -> String {
        clock::format_duration_human(self.time_left)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertDecision {
    /// Goes to every sink.
    Alert { mob_id: i64, message: String },
    /// Console only.
    Notice { mob_id: i64, message: String },
}

impl AlertDecision {
    pub fn mob_id(&self) -> i64 {
        match self {
            AlertDecision::Alert { mob_id, .. } | AlertDecision::Notice { mob_id, .. } => *mob_id,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AlertDecision::Alert { message, .. } | AlertDecision::Notice { message, .. } => {
                message.as_str()
            }
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, AlertDecision::Alert { .. })
    }
}

pub struct AlertEvaluator<'a> {
    policy: &'a AlertPolicy,
    rewards: &'a RewardTable,
}

impl<'a> AlertEvaluator<'a> {
    pub fn new(policy: &'a AlertPolicy, rewards: &'a RewardTable) -> Self {
        Self { policy, rewards }
    }

    pub fn assess(&self, mob: &Mob, now: DateTime<FixedOffset>) -> Result<MobAssessment, DomainError> {
        let despawn_local = clock::convert_to_zone(&mob.despawn_time)?;
        let time_left = clock::time_between(now, despawn_local);
        let minutes_left = clock::total_minutes(time_left);
        let prize = self.rewards.first_place_prize(mob.reward_group_id);
        let eligible = self.policy.is_eligible(minutes_left, mob.reward_group_id);
        Ok(MobAssessment {
            mob: mob.clone(),
            despawn_local,
            time_left,
            minutes_left,
            prize,
            eligible,
        })
    }

    /// Decides what to emit for each new mob. A single bad timestamp fails the
    /// whole batch so a cycle never dispatches a partial set.
    pub fn evaluate(
        &self,
        new_mobs: &[Mob],
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<AlertDecision>, DomainError> {
        let assessments = new_mobs
            .iter()
            .map(|mob| self.assess(mob, now))
            .collect::<Result<Vec<_>, _>>()?;

        let mut decisions = Vec::new();
        for assessment in &assessments {
            if assessment.eligible {
                decisions.push(AlertDecision::Alert {
                    mob_id: assessment.mob.id,
                    message: render_alert(assessment),
                });
            } else if self.policy.verbose_on_ineligible {
                decisions.push(AlertDecision::Notice {
                    mob_id: assessment.mob.id,
                    message: render_notice(assessment),
                });
            }
        }
        Ok(decisions)
    }
}

pub fn render_alert(assessment: &MobAssessment) -> String {
    let mob = &assessment.mob;
    format!(
        "Alert: New mob Spawned!\n\
ID: {}\n\
Region: {}\n\
Level: {}\n\
Time Left: {}\n\
Reward Group ID: {}\n\
1st Prize: {}",
        mob.id,
        mob.region,
        mob.level,
        assessment.time_left_text(),
        mob.reward_group_id,
        assessment.prize
    )
}

pub fn render_notice(assessment: &MobAssessment) -> String {
    let mob = &assessment.mob;
    format!(
        "New mob {} ({} Lv{}) spawned, {} left, despawns {}",
        mob.id,
        mob.region,
        mob.level,
        assessment.time_left_text(),
        clock::format_clock(&assessment.despawn_local)
    )
}
