use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::candidate::Position;
use crate::{PlacementError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Gt,
}

/// A single strict comparison against one coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBound {
    pub axis: Axis,
    pub cmp: Comparison,
    pub value: i32,
}

impl AxisBound {
    pub const fn new(axis: Axis, cmp: Comparison, value: i32) -> Self {
        Self { axis, cmp, value }
    }

    pub fn holds(&self, position: Position) -> bool {
        let coord = match self.axis {
            Axis::X => position.x,
            Axis::Y => position.y,
            Axis::Z => position.z,
        };
        match self.cmp {
            Comparison::Lt => coord < self.value,
            Comparison::Gt => coord > self.value,
        }
    }
}

/// Level-specific acceptance test for a single placed object.
///
/// Each entry of `reject` is a set of bounds that must all hold for the
/// position to be rejected; a position is accepted when no rule matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialFilter {
    #[serde(default)]
    pub reject: Vec<Vec<AxisBound>>,
}

impl SpatialFilter {
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Hiding spots for the glasses level: nothing upstairs, nothing in
    /// the bathroom or the rooms next to it.
    pub fn glasses() -> Self {
        Self {
            reject: vec![
                vec![AxisBound::new(Axis::Y, Comparison::Lt, 0)],
                vec![
                    AxisBound::new(Axis::X, Comparison::Gt, 35000),
                    AxisBound::new(Axis::Z, Comparison::Lt, 10000),
                ],
            ],
        }
    }

    /// Spike upstairs, on the left side of the stairs, right after them.
    pub fn spike_upstairs() -> Self {
        Self {
            reject: vec![
                vec![AxisBound::new(Axis::Y, Comparison::Gt, 0)],
                vec![AxisBound::new(Axis::Z, Comparison::Gt, 0)],
                vec![AxisBound::new(Axis::X, Comparison::Gt, 10000)],
            ],
        }
    }

    /// Spike anywhere outside.
    pub fn spike_outside() -> Self {
        Self {
            reject: vec![vec![AxisBound::new(Axis::Y, Comparison::Lt, 0)]],
        }
    }

    pub fn accepts(&self, position: Position) -> bool {
        !self
            .reject
            .iter()
            .any(|rule| rule.iter().all(|bound| bound.holds(position)))
    }
}

/// Everything needed to replay placement for one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub name: String,
    pub object_name: String,
    /// File name of the candidate dump, resolved against the data directory.
    pub dump: String,
    pub num_objects: usize,
    /// Player spawn, used as the scoring reference point.
    pub spawn: Position,
    /// RNG calls the game makes before placement starts.
    #[serde(default)]
    pub preincrement: u32,
    #[serde(default)]
    pub filter: SpatialFilter,
}

impl LevelConfig {
    pub fn glasses() -> Self {
        Self {
            name: "glasses".to_string(),
            object_name: "NPC Hiding".to_string(),
            dump: "hidingLocations.dmp".to_string(),
            num_objects: 3,
            spawn: Position::new(3309, 670, 16563),
            preincrement: 7,
            filter: SpatialFilter::glasses(),
        }
    }

    pub fn spike() -> Self {
        Self {
            name: "spike".to_string(),
            object_name: "Spike".to_string(),
            dump: "spikeLocations.dmp".to_string(),
            num_objects: 1,
            spawn: Position::new(28657, 779, 13322),
            preincrement: 0,
            filter: SpatialFilter::spike_upstairs(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PlacementError::Config("level name must not be empty".to_string()));
        }
        if self.num_objects == 0 {
            return Err(PlacementError::Config(format!(
                "level '{}' must place at least one object",
                self.name
            )));
        }
        if self.filter.reject.iter().any(|rule| rule.is_empty()) {
            return Err(PlacementError::Config(format!(
                "level '{}' has an empty filter rule, which would reject everything",
                self.name
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct LevelFile {
    levels: Vec<LevelConfig>,
}

/// Named set of levels the search can run against.
#[derive(Debug, Clone, Default)]
pub struct LevelRegistry {
    levels: BTreeMap<String, LevelConfig>,
}

impl LevelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The levels whose candidate tables have been documented.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.levels.insert("glasses".to_string(), LevelConfig::glasses());
        registry.levels.insert("spike".to_string(), LevelConfig::spike());
        registry
    }

    /// Parse a level file of the form `{"levels": [...]}`.
    pub fn from_json_str(src: &str) -> Result<Self> {
        let file: LevelFile = serde_json::from_str(src)?;
        let mut registry = Self::new();
        for level in file.levels {
            registry.insert(level)?;
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let src = fs::read_to_string(path)?;
        Self::from_json_str(&src)
    }

    pub fn insert(&mut self, level: LevelConfig) -> Result<()> {
        level.validate()?;
        self.levels.insert(level.name.clone(), level);
        Ok(())
    }

    /// Adds every level from `other`, replacing levels with the same name.
    pub fn extend(&mut self, other: LevelRegistry) {
        self.levels.extend(other.levels);
    }

    pub fn get(&self, name: &str) -> Result<&LevelConfig> {
        self.levels
            .get(name)
            .ok_or_else(|| PlacementError::UnknownLevel {
                name: name.to_string(),
                known: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.levels.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelConfig> {
        self.levels.values()
    }
}
