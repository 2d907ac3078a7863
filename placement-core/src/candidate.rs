use serde::{Deserialize, Serialize};
use std::fmt;

/// World coordinates as the game stores them. Y grows downwards, so
/// "upstairs" is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One spot the game may pick when placing an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRecord {
    pub position: Position,
    /// Percent threshold: a roll strictly below this selects the candidate.
    pub chance: u8,
    /// Flag as captured in the dump. Selection keeps its own usage state
    /// and never reads or writes this.
    pub in_use: bool,
}

impl CandidateRecord {
    pub fn new(position: Position, chance: u8) -> Self {
        Self {
            position,
            chance,
            in_use: false,
        }
    }

    /// Builds a record from the packed info word found in memory dumps:
    /// bits 8..16 hold the chance, bits 24..32 the in-use flag.
    pub fn from_packed(position: Position, info: u32) -> Self {
        Self {
            position,
            chance: ((info >> 8) & 0xFF) as u8,
            in_use: (info >> 24) & 0xFF != 0,
        }
    }
}
