use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};

use crate::entities::Mob;
use crate::services::clock::now_in_zone;

/// Read-only copy of the current generation handed to readers.
#[derive(Debug, Clone, Default)]
pub struct MobSnapshot {
    pub mobs: Vec<Mob>,
    pub last_updated: Option<DateTime<FixedOffset>>,
}

/// Two-generation snapshot history.
///
/// Holds the latest poll result and the id set of the one before it. Nothing
/// counts as new until a second snapshot has been stored, so a fresh process
/// never alerts on everything that was already up when it started.
#[derive(Debug, Default)]
pub struct MobList {
    mobs: Vec<Mob>,
    previous_ids: HashSet<i64>,
    last_updated: Option<DateTime<FixedOffset>>,
    generation: u64,
}

impl MobList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, new_mobs: Vec<Mob>) {
        self.update_at(new_mobs, now_in_zone());
    }

    pub fn update_at(&mut self, new_mobs: Vec<Mob>, at: DateTime<FixedOffset>) {
        self.previous_ids = self.mobs.iter().map(|mob| mob.id).collect();
        self.mobs = new_mobs;
        self.last_updated = Some(at);
        self.generation += 1;
    }

    pub fn new_mobs(&self) -> Vec<Mob> {
        if self.generation < 2 {
            return Vec::new();
        }
        self.mobs
            .iter()
            .filter(|mob| !self.previous_ids.contains(&mob.id))
            .cloned()
            .collect()
    }

    pub fn current(&self) -> MobSnapshot {
        MobSnapshot {
            mobs: self.mobs.clone(),
            last_updated: self.last_updated,
        }
    }

    pub fn last_updated(&self) -> Option<DateTime<FixedOffset>> {
        self.last_updated
    }
}
