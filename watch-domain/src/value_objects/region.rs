// Region value object

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Pirate,
    Cat,
    Wolf,
    Food,
    Unknown,
}

impl Region {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Region::Pirate,
            1 => Region::Cat,
            2 => Region::Wolf,
            3 => Region::Food,
            _ => Region::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Pirate => "Pirate",
            Region::Cat => "Cat",
            Region::Wolf => "Wolf",
            Region::Food => "Food",
            Region::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
