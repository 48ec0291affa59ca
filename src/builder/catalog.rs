//! Prefab resolution for build items.
//!
//! Room and boss floors fall back to the plain floor, the boss door falls
//! back to the plain door. Floors and walls may swap in an alternative, and
//! spawners may pick a random variant. A kind that resolves to nothing is
//! skipped by the builder.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::build_queue::TileKind;
use crate::config::BuildConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefabCatalog {
    pub floor: Option<String>,
    pub room_floor: Option<String>,
    pub boss_floor: Option<String>,
    pub wall: Option<String>,
    pub door: Option<String>,
    pub boss_door: Option<String>,
    pub spawner: Option<String>,
    pub alternative_floors: Vec<String>,
    pub alternative_walls: Vec<String>,
    pub spawner_variants: Vec<String>,
}

fn pick<'a, R: Rng + ?Sized>(options: &'a [String], rng: &mut R) -> Option<&'a str> {
    if options.is_empty() {
        None
    } else {
        Some(options[rng.gen_range(0..options.len())].as_str())
    }
}

impl PrefabCatalog {
    /// One prefab per tile kind, named after the kind, with no alternatives.
    pub fn standard() -> Self {
        let name = |k: TileKind| Some(k.name().to_string());
        Self {
            floor: name(TileKind::Floor),
            room_floor: name(TileKind::RoomFloor),
            boss_floor: name(TileKind::BossFloor),
            wall: name(TileKind::Wall),
            door: name(TileKind::Door),
            boss_door: name(TileKind::BossDoor),
            spawner: name(TileKind::Spawner),
            ..Self::default()
        }
    }

    /// Base prefab for `kind` after fallbacks, without any random choice.
    pub fn base(&self, kind: TileKind) -> Option<&str> {
        let floor = self.floor.as_deref();
        let door = self.door.as_deref();
        match kind {
            TileKind::Floor => floor,
            TileKind::RoomFloor => self.room_floor.as_deref().or(floor),
            TileKind::BossFloor => self.boss_floor.as_deref().or(floor),
            TileKind::Wall => self.wall.as_deref(),
            TileKind::Door => door,
            TileKind::BossDoor => self.boss_door.as_deref().or(door),
            TileKind::Spawner => self.spawner.as_deref(),
        }
    }

    /// Concrete prefab for one item. Draws from `rng` only when the kind's
    /// variety option is enabled.
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        kind: TileKind,
        build: &BuildConfig,
        rng: &mut R,
    ) -> Option<&str> {
        let base = self.base(kind)?;
        let alternatives = match kind {
            TileKind::Floor if build.use_alternative_floors => &self.alternative_floors,
            TileKind::Wall if build.use_alternative_walls => &self.alternative_walls,
            TileKind::Spawner if build.use_random_spawner_variants => {
                return Some(pick(&self.spawner_variants, rng).unwrap_or(base));
            }
            _ => return Some(base),
        };
        if rng.gen::<f32>() < build.alternative_prefab_chance {
            Some(pick(alternatives, rng).unwrap_or(base))
        } else {
            Some(base)
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}
