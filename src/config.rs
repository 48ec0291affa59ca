//! Generator and build configuration.
//!
//! Every value is host supplied. Defaults reproduce the reference stage, and
//! presets may override any subset of fields from RON or JSON files.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{MAX_EXTENT, MAX_NODE_COUNT, MIN_ROOM_SIDE, PERCENT};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported preset format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn ensure(ok: bool, field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.into(),
        })
    }
}

fn ensure_range(field: &'static str, min: i32, max: i32) -> Result<(), ConfigError> {
    ensure(min <= max, field, format!("min {min} exceeds max {max}"))
}

fn ensure_extent(field: &'static str, value: i32) -> Result<(), ConfigError> {
    ensure(
        value <= MAX_EXTENT,
        field,
        format!("{value} exceeds {MAX_EXTENT}"),
    )
}

fn ensure_chance(field: &'static str, chance: i32) -> Result<(), ConfigError> {
    ensure(
        (0..=PERCENT).contains(&chance),
        field,
        format!("{chance} is outside 0..={PERCENT}"),
    )
}

/// Parse a RON or JSON file, picked by extension.
pub(crate) fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(ron::from_str(&content)?),
        Some("json") => Ok(serde_json::from_str(&content)?),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// Node network parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Half extent: nodes are sampled in `[-map_size, map_size]²`
    pub map_size: i32,
    pub node_count: usize,
    pub min_node_distance: i32,
    pub min_tunnel_width: i32,
    pub max_tunnel_width: i32,
    pub extra_connections: usize,
    /// Percent chance for each extra connection roll
    pub connection_chance: i32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            map_size: 60,
            node_count: 25,
            min_node_distance: 18,
            min_tunnel_width: 3,
            max_tunnel_width: 5,
            extra_connections: 12,
            connection_chance: 75,
        }
    }
}

/// Side-branch and room parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Percent chance per branch roll
    pub branch_chance: i32,
    pub branch_length: i32,
    pub min_branch_width: i32,
    pub max_branch_width: i32,
    pub min_room_size: i32,
    pub max_room_size: i32,
    pub max_rooms_per_node: i32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            branch_chance: 80,
            branch_length: 8,
            min_branch_width: 2,
            max_branch_width: 4,
            min_room_size: 5,
            max_room_size: 10,
            max_rooms_per_node: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossRoomConfig {
    pub enabled: bool,
    pub size: i32,
    pub corridor_width: i32,
    pub min_distance_from_center: i32,
    pub tunnel_buffer: i32,
    /// Queue a spawner at the boss room centre
    pub spawn_inside: bool,
}

impl Default for BossRoomConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 20,
            corridor_width: 2,
            min_distance_from_center: 35,
            tunnel_buffer: 2,
            spawn_inside: true,
        }
    }
}

/// Everything the layout pipeline reads
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    pub network: NetworkConfig,
    pub rooms: RoomConfig,
    pub boss_room: BossRoomConfig,
}

impl DungeonConfig {
    pub fn with_boss_room(mut self, enabled: bool) -> Self {
        self.boss_room.enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let net = &self.network;
        ensure(net.map_size > 0, "network.map_size", "must be positive")?;
        ensure_extent("network.map_size", net.map_size)?;
        ensure(
            net.node_count <= MAX_NODE_COUNT,
            "network.node_count",
            format!("{} exceeds {MAX_NODE_COUNT}", net.node_count),
        )?;
        ensure_extent("network.min_node_distance", net.min_node_distance)?;
        ensure_extent("network.max_tunnel_width", net.max_tunnel_width)?;
        ensure(
            net.min_node_distance >= 0,
            "network.min_node_distance",
            "must not be negative",
        )?;
        ensure(
            net.min_tunnel_width > 0,
            "network.min_tunnel_width",
            "must be positive",
        )?;
        ensure_range(
            "network.tunnel_width",
            net.min_tunnel_width,
            net.max_tunnel_width,
        )?;
        ensure_chance("network.connection_chance", net.connection_chance)?;

        let rooms = &self.rooms;
        ensure_chance("rooms.branch_chance", rooms.branch_chance)?;
        ensure(
            rooms.branch_length >= 1,
            "rooms.branch_length",
            "must be at least 1 so diagonal rooms touch their node",
        )?;
        ensure_extent("rooms.branch_length", rooms.branch_length)?;
        ensure_extent("rooms.max_branch_width", rooms.max_branch_width)?;
        ensure_range(
            "rooms.branch_width",
            rooms.min_branch_width,
            rooms.max_branch_width,
        )?;
        ensure(
            rooms.min_room_size >= MIN_ROOM_SIDE,
            "rooms.min_room_size",
            format!("must be at least {MIN_ROOM_SIDE} to reach the branch tip"),
        )?;
        ensure_range("rooms.room_size", rooms.min_room_size, rooms.max_room_size)?;
        ensure_extent("rooms.max_room_size", rooms.max_room_size)?;
        ensure(
            rooms.max_rooms_per_node >= 1,
            "rooms.max_rooms_per_node",
            "must be at least 1",
        )?;

        let boss = &self.boss_room;
        ensure(boss.size > 0, "boss_room.size", "must be positive")?;
        ensure_extent("boss_room.size", boss.size)?;
        ensure_extent("boss_room.corridor_width", boss.corridor_width)?;
        ensure_extent(
            "boss_room.min_distance_from_center",
            boss.min_distance_from_center,
        )?;
        ensure_extent("boss_room.tunnel_buffer", boss.tunnel_buffer)?;
        ensure(
            boss.corridor_width >= 0,
            "boss_room.corridor_width",
            "must not be negative",
        )?;
        ensure(
            boss.min_distance_from_center >= 0,
            "boss_room.min_distance_from_center",
            "must not be negative",
        )?;
        ensure(
            boss.tunnel_buffer >= 0,
            "boss_room.tunnel_buffer",
            "must not be negative",
        )?;
        Ok(())
    }

    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = load_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Staged-build pacing and prefab variety
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub blocks_per_frame: usize,
    pub block_build_delay_secs: f32,
    /// World units per grid cell
    pub spacing: f32,
    /// Extra height for spawners
    pub spawner_height: f32,
    pub use_alternative_floors: bool,
    pub use_alternative_walls: bool,
    /// 0.0-1.0
    pub alternative_prefab_chance: f32,
    pub use_random_spawner_variants: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            blocks_per_frame: 50,
            block_build_delay_secs: 0.01,
            spacing: 1.5,
            spawner_height: 0.5,
            use_alternative_floors: true,
            use_alternative_walls: true,
            alternative_prefab_chance: 0.3,
            use_random_spawner_variants: true,
        }
    }
}

impl BuildConfig {
    pub fn block_build_delay(&self) -> Duration {
        Duration::try_from_secs_f32(self.block_build_delay_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.blocks_per_frame > 0,
            "build.blocks_per_frame",
            "must be positive",
        )?;
        ensure(
            self.block_build_delay_secs.is_finite() && self.block_build_delay_secs >= 0.0,
            "build.block_build_delay_secs",
            "must be finite and not negative",
        )?;
        ensure(self.spacing > 0.0, "build.spacing", "must be positive")?;
        ensure(
            (0.0..=1.0).contains(&self.alternative_prefab_chance),
            "build.alternative_prefab_chance",
            "must be within 0.0..=1.0",
        )?;
        Ok(())
    }
}

/// Named dungeon parameters the host swaps between levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagePreset {
    pub name: String,
    #[serde(default)]
    pub dungeon: DungeonConfig,
}

impl StagePreset {
    pub fn new(name: impl Into<String>, dungeon: DungeonConfig) -> Self {
        Self {
            name: name.into(),
            dungeon,
        }
    }
}
