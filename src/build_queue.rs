//! Build-queue compiler.
//!
//! Turns a finished [`Layout`] into the ordered placement list the staged
//! builder consumes: floors, then walls, then doors, then spawners.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::constants::BOSS_DOOR_RADIUS;
use crate::generation::Layout;
use crate::grid::{GridPos, ALL_DIRECTIONS, CARDINAL_DIRECTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileKind {
    Floor,
    RoomFloor,
    BossFloor,
    Wall,
    Door,
    BossDoor,
    Spawner,
}

impl TileKind {
    pub const ALL: [TileKind; 7] = [
        TileKind::Floor,
        TileKind::RoomFloor,
        TileKind::BossFloor,
        TileKind::Wall,
        TileKind::Door,
        TileKind::BossDoor,
        TileKind::Spawner,
    ];

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Floor => 0,
            Self::RoomFloor => 1,
            Self::BossFloor => 2,
            Self::Wall => 3,
            Self::Door => 4,
            Self::BossDoor => 5,
            Self::Spawner => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::RoomFloor => "room_floor",
            Self::BossFloor => "boss_floor",
            Self::Wall => "wall",
            Self::Door => "door",
            Self::BossDoor => "boss_door",
            Self::Spawner => "spawner",
        }
    }

    pub fn is_floor(&self) -> bool {
        matches!(self, Self::Floor | Self::RoomFloor | Self::BossFloor)
    }
}

/// One placement instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildItem {
    pub pos: GridPos,
    pub kind: TileKind,
}

impl BuildItem {
    pub const fn new(pos: GridPos, kind: TileKind) -> Self {
        Self { pos, kind }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildQueue {
    pub items: Vec<BuildItem>,
}

impl BuildQueue {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, kind: TileKind) -> usize {
        self.items.iter().filter(|i| i.kind == kind).count()
    }

    pub fn positions(&self, kind: TileKind) -> impl Iterator<Item = GridPos> + '_ {
        self.items
            .iter()
            .filter(move |i| i.kind == kind)
            .map(|i| i.pos)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BuildItem> {
        self.items.iter()
    }
}

fn floor_kind(layout: &Layout, pos: GridPos) -> TileKind {
    if layout.is_boss_cell(pos) {
        TileKind::BossFloor
    } else if layout.is_room_cell(pos) {
        TileKind::RoomFloor
    } else {
        TileKind::Floor
    }
}

fn push_floors(layout: &Layout, items: &mut Vec<BuildItem>) {
    items.extend(layout.floor.iter().map(|&p| BuildItem::new(p, floor_kind(layout, p))));
}

fn push_walls(layout: &Layout, items: &mut Vec<BuildItem>) {
    let mut placed = BTreeSet::new();
    for &pos in &layout.floor {
        for dir in ALL_DIRECTIONS {
            let neighbour = pos + dir;
            if !layout.is_floor(neighbour) && placed.insert(neighbour) {
                items.push(BuildItem::new(neighbour, TileKind::Wall));
            }
        }
    }
}

fn push_doors(layout: &Layout, items: &mut Vec<BuildItem>) {
    let Some(boss) = layout.boss else { return };
    let mut placed = BTreeSet::new();
    for &pos in &layout.boss_room {
        for dir in CARDINAL_DIRECTIONS {
            let neighbour = pos + dir;
            let opening = layout.is_floor(neighbour)
                && !layout.is_boss_cell(neighbour)
                && !layout.is_room_cell(neighbour);
            if opening && placed.insert(neighbour) {
                let kind = if neighbour.is_within(boss.entrance, BOSS_DOOR_RADIUS) {
                    TileKind::BossDoor
                } else {
                    TileKind::Door
                };
                items.push(BuildItem::new(neighbour, kind));
            }
        }
    }
}

fn push_spawners(layout: &Layout, spawn_in_boss_room: bool, items: &mut Vec<BuildItem>) {
    items.extend(
        layout
            .room_centers
            .iter()
            .map(|&c| BuildItem::new(c, TileKind::Spawner)),
    );
    if let Some(boss) = layout.boss.filter(|_| spawn_in_boss_room) {
        items.push(BuildItem::new(boss.center, TileKind::Spawner));
    }
}

/// Compiles the layout. Pure: the same layout always yields the same queue.
pub fn compile(layout: &Layout, spawn_in_boss_room: bool) -> BuildQueue {
    let mut items = Vec::with_capacity(layout.floor.len() * 2);
    push_floors(layout, &mut items);
    push_walls(layout, &mut items);
    push_doors(layout, &mut items);
    push_spawners(layout, spawn_in_boss_room, &mut items);
    BuildQueue { items }
}
