//! Boss room placement.
//!
//! Candidates are sampled in polar coordinates around the origin and
//! accepted when the room, inflated by its tunnel buffer, fits the map.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use tracing::{debug, warn};

use super::layout::{BossRoom, Layout, RoomSize};
use super::rolls::range_f64;
use crate::config::DungeonConfig;
use crate::constants::{BOSS_BOUNDARY_MARGIN, BOSS_PLACEMENT_ATTEMPTS};
use crate::grid::GridPos;

/// How the boss room centre was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BossPlacement {
    /// Accepted on the given attempt (1-based)
    Sampled { attempts: u32 },
    /// Every sample failed; the centre is `(min_distance_from_center, 0)`
    /// and was not checked against the map boundary.
    Fallback,
}

impl BossPlacement {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback)
    }
}

/// True when the boss square plus `tunnel_buffer + 3` stays inside
/// `[-map_size, map_size]²`.
pub fn fits_within_map(center: GridPos, config: &DungeonConfig) -> bool {
    let map = config.network.map_size;
    let reach = (config.boss_room.size / 2)
        .saturating_add(config.boss_room.tunnel_buffer)
        .saturating_add(BOSS_BOUNDARY_MARGIN);
    center.x.saturating_sub(reach) >= map.saturating_neg()
        && center.x.saturating_add(reach) <= map
        && center.y.saturating_sub(reach) >= map.saturating_neg()
        && center.y.saturating_add(reach) <= map
}

pub fn find_position<R: Rng + ?Sized>(
    config: &DungeonConfig,
    rng: &mut R,
) -> (GridPos, BossPlacement) {
    let boss = &config.boss_room;
    let min_radius = boss.min_distance_from_center as f64;
    let max_radius = (config.network.map_size - boss.size / 2) as f64;

    for attempt in 1..=BOSS_PLACEMENT_ATTEMPTS {
        let angle = rng.gen_range(0.0..TAU);
        let radius = range_f64(rng, min_radius, max_radius);
        let candidate = GridPos::new(
            (radius * angle.cos()).round() as i32,
            (radius * angle.sin()).round() as i32,
        );
        if fits_within_map(candidate, config) {
            return (candidate, BossPlacement::Sampled { attempts: attempt });
        }
    }

    (
        GridPos::new(boss.min_distance_from_center, 0),
        BossPlacement::Fallback,
    )
}

/// Fills the boss square (`-size/2..=size/2` on both axes) and records
/// its size under the centre.
pub fn stamp_boss_room(layout: &mut Layout, center: GridPos, size: i32) {
    let half = size / 2;
    for x in -half..=half {
        for y in -half..=half {
            layout.stamp_boss_cell(center + GridPos::new(x, y));
        }
    }
    layout.room_sizes.insert(center, RoomSize::square(size));
    layout.boss = Some(BossRoom {
        center,
        entrance: center,
        size,
    });
}

pub fn place_boss_room<R: Rng + ?Sized>(
    layout: &mut Layout,
    config: &DungeonConfig,
    rng: &mut R,
) -> BossPlacement {
    let (center, placement) = find_position(config, rng);
    match placement {
        BossPlacement::Sampled { attempts } => {
            debug!(%center, attempts, "Boss room placed");
        }
        BossPlacement::Fallback => {
            warn!(
                %center,
                fallback = true,
                in_bounds = fits_within_map(center, config),
                "No valid boss room position after {} attempts, using fallback",
                BOSS_PLACEMENT_ATTEMPTS
            );
        }
    }
    stamp_boss_room(layout, center, config.boss_room.size);
    placement
}

/// Exclusion zone around the boss room: a disc that nodes, tunnels,
/// branches and branch rooms stay out of, plus the boss square and its
/// wall ring, which only the boss corridor may open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BossGuard {
    pub center: GridPos,
    pub radius: i32,
    /// Half side of the boss square plus one
    pub footprint: i32,
}

impl BossGuard {
    /// `None` when the layout has no boss room.
    pub fn for_layout(layout: &Layout, config: &DungeonConfig) -> Option<Self> {
        layout.boss.map(|boss| Self {
            center: boss.center,
            radius: boss
                .half_size()
                .saturating_add(config.boss_room.tunnel_buffer)
                .saturating_add(config.network.min_node_distance),
            footprint: boss.half_size().saturating_add(1),
        })
    }

    pub fn blocks(&self, pos: GridPos) -> bool {
        pos.is_within(self.center, self.radius) || self.touches_room(pos)
    }

    /// True on the boss square or the ring of cells around it.
    pub fn touches_room(&self, pos: GridPos) -> bool {
        self.center.chebyshev_distance(pos) <= self.footprint as i64
    }
}

pub(crate) fn is_blocked(guard: Option<BossGuard>, pos: GridPos) -> bool {
    guard.is_some_and(|g| g.blocks(pos))
}
