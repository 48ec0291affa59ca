//! Floor progression and stage presets.
//!
//! A schedule maps floor levels to stage presets. Every `boss_interval`
//! floors the stage advances and the floor gets a boss room.

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::{load_file, ConfigError, DungeonConfig, StagePreset};
use crate::generation::DungeonSeed;

fn default_boss_interval() -> u32 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSchedule {
    pub stages: Vec<StagePreset>,
    #[serde(default = "default_boss_interval")]
    pub boss_interval: u32,
}

impl Default for StageSchedule {
    fn default() -> Self {
        Self {
            stages: vec![StagePreset::new("default", DungeonConfig::default())],
            boss_interval: default_boss_interval(),
        }
    }
}

/// Everything needed to generate one floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorPlan {
    pub floor_level: u32,
    pub stage_index: usize,
    pub stage_name: String,
    pub seed: u64,
    pub boss_floor: bool,
    pub config: DungeonConfig,
}

impl StageSchedule {
    pub fn new(stages: Vec<StagePreset>, boss_interval: u32) -> Self {
        Self {
            stages,
            boss_interval,
        }
    }

    /// `floor_level / boss_interval`, clamped to the last stage.
    pub fn stage_index(&self, floor_level: u32) -> usize {
        let index = (floor_level / self.boss_interval.max(1)) as usize;
        index.min(self.stages.len().saturating_sub(1))
    }

    pub fn is_boss_floor(&self, floor_level: u32) -> bool {
        floor_level > 0 && floor_level % self.boss_interval.max(1) == 0
    }

    /// `None` when the schedule has no stages.
    pub fn plan(&self, seed: &DungeonSeed, floor_level: u32) -> Option<FloorPlan> {
        let stage_index = self.stage_index(floor_level);
        let stage = self.stages.get(stage_index)?;
        let boss_floor = self.is_boss_floor(floor_level);
        Some(FloorPlan {
            floor_level,
            stage_index,
            stage_name: stage.name.clone(),
            seed: seed.floor_hash(floor_level),
            boss_floor,
            config: stage.dungeon.clone().with_boss_room(boss_floor),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::Invalid {
                field: "stages",
                reason: "schedule needs at least one stage".to_string(),
            });
        }
        if self.boss_interval == 0 {
            return Err(ConfigError::Invalid {
                field: "boss_interval",
                reason: "must be positive".to_string(),
            });
        }
        for stage in &self.stages {
            stage.dungeon.validate().map_err(|e| ConfigError::Invalid {
                field: "stages",
                reason: format!("stage '{}': {e}", stage.name),
            })?;
        }
        Ok(())
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let schedule: Self = serde_json::from_str(s)?;
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let schedule: Self = ron::from_str(s)?;
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let schedule: Self = load_file(path.as_ref())?;
        schedule.validate()?;
        Ok(schedule)
    }
}

/// Floor progression tracker
#[derive(Resource, Debug, Clone)]
pub struct DungeonProgress {
    pub seed: DungeonSeed,
    pub current_floor: u32,
    pub highest_reached: u32,
    pub floors_cleared: Vec<u32>,
}

impl DungeonProgress {
    pub fn new(seed: u64) -> Self {
        Self {
            seed: DungeonSeed::new(seed),
            current_floor: 0,
            highest_reached: 0,
            floors_cleared: Vec::new(),
        }
    }

    /// Moves to the next floor and returns its level.
    pub fn advance(&mut self) -> u32 {
        self.current_floor += 1;
        self.highest_reached = self.highest_reached.max(self.current_floor);
        self.current_floor
    }

    pub fn is_cleared(&self, floor: u32) -> bool {
        self.floors_cleared.contains(&floor)
    }

    pub fn clear_floor(&mut self, floor: u32) {
        if !self.floors_cleared.contains(&floor) {
            self.floors_cleared.push(floor);
        }
    }

    pub fn current_plan(&self, schedule: &StageSchedule) -> Option<FloorPlan> {
        schedule.plan(&self.seed, self.current_floor)
    }
}
