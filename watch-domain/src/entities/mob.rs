// Mob entity
// One battlefield spawn as reported by the remote regions endpoint

use serde::{Deserialize, Serialize};

use crate::value_objects::Region;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mob {
    pub id: i64,
    pub region: Region,
    pub level: u32,
    /// Raw UTC despawn timestamp as sent by the server, e.g. `2024-05-01T10:00:00.000Z`.
    pub despawn_time: String,
    pub reward_group_id: i64,
}

/// Wire shape of `POST /battlefield/getAllRegions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionsPayload {
    #[serde(default)]
    pub regions: Vec<RegionEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionEntry {
    pub region: i64,
    #[serde(default)]
    pub battlefields: Vec<BattlefieldEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattlefieldEntry {
    pub id: i64,
    pub level: u32,
    #[serde(rename = "disappearedTime")]
    pub disappeared_time: String,
    #[serde(rename = "rewardGroupId")]
    pub reward_group_id: i64,
}

impl RegionsPayload {
    /// Flattens regions into a snapshot, keeping server order.
    pub fn into_mobs(self) -> Vec<Mob> {
        let mut mobs = Vec::new();
        for entry in self.regions {
            let region = Region::from_code(entry.region);
            for battlefield in entry.battlefields {
                mobs.push(Mob {
                    id: battlefield.id,
                    region,
                    level: battlefield.level,
                    despawn_time: battlefield.disappeared_time,
                    reward_group_id: battlefield.reward_group_id,
                });
            }
        }
        mobs
    }
}
