// Reward table entity

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const NO_PRIZE_DATA: &str = "No data available";

/// Reward groups keyed by stringified id; each value lists prize tuples by placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardTable {
    groups: HashMap<String, Vec<Vec<String>>>,
}

impl RewardTable {
    pub fn new(groups: HashMap<String, Vec<Vec<String>>>) -> Self {
        Self { groups }
    }

    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn first_place_prize(&self, reward_group_id: i64) -> String {
        match self
            .groups
            .get(&reward_group_id.to_string())
            .and_then(|places| places.first())
        {
            Some(first) => first.join(", "),
            None => NO_PRIZE_DATA.to_string(),
        }
    }
}
