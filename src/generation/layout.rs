//! Spatial layout state for one generation run.
//!
//! Cells are only ever added. The compiler reads the finished layout
//! immutably, and the session keeps it afterwards for room-size lookups.

use petgraph::graphmap::UnGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::grid::{GridPos, CARDINAL_DIRECTIONS};

/// Drawn room extent in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSize {
    pub width: i32,
    pub height: i32,
}

impl RoomSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub const fn square(side: i32) -> Self {
        Self::new(side, side)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossRoom {
    pub center: GridPos,
    /// Corridor cell where the network joins the room. Equals `center`
    /// until the corridor is carved.
    pub entrance: GridPos,
    pub size: i32,
}

impl BossRoom {
    pub fn half_size(&self) -> i32 {
        self.size / 2
    }
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Every walkable cell
    pub floor: BTreeSet<GridPos>,
    /// Branch-room interiors (subset of `floor`)
    pub rooms: BTreeSet<GridPos>,
    /// Boss-room interior (subset of `floor`)
    pub boss_room: BTreeSet<GridPos>,
    /// Cells stamped by the boss corridor (subset of `floor`)
    pub boss_corridor: BTreeSet<GridPos>,
    /// Graph vertices, origin first
    pub nodes: Vec<GridPos>,
    pub connections: UnGraphMap<GridPos, ()>,
    pub room_centers: Vec<GridPos>,
    pub room_sizes: BTreeMap<GridPos, RoomSize>,
    pub boss: Option<BossRoom>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, pos: GridPos) {
        self.nodes.push(pos);
        self.connections.add_node(pos);
    }

    /// Adds an undirected edge. Returns false for self-loops and edges
    /// that already exist.
    pub fn connect(&mut self, a: GridPos, b: GridPos) -> bool {
        if a == b || self.connections.contains_edge(a, b) {
            return false;
        }
        self.connections.add_edge(a, b, ());
        true
    }

    pub fn is_connected(&self, a: GridPos, b: GridPos) -> bool {
        self.connections.contains_edge(a, b)
    }

    pub fn edge_count(&self) -> usize {
        self.connections.edge_count()
    }

    /// Neighbours of `node` in edge insertion order.
    pub fn neighbours(&self, node: GridPos) -> Vec<GridPos> {
        self.connections.neighbors(node).collect()
    }

    pub fn stamp_floor(&mut self, pos: GridPos) {
        self.floor.insert(pos);
    }

    pub fn stamp_room_cell(&mut self, pos: GridPos) {
        self.floor.insert(pos);
        self.rooms.insert(pos);
    }

    pub fn stamp_boss_cell(&mut self, pos: GridPos) {
        self.floor.insert(pos);
        self.boss_room.insert(pos);
    }

    pub fn stamp_corridor_cell(&mut self, pos: GridPos) {
        self.floor.insert(pos);
        self.boss_corridor.insert(pos);
    }

    pub fn is_floor(&self, pos: GridPos) -> bool {
        self.floor.contains(&pos)
    }

    pub fn is_room_cell(&self, pos: GridPos) -> bool {
        self.rooms.contains(&pos)
    }

    pub fn is_boss_cell(&self, pos: GridPos) -> bool {
        self.boss_room.contains(&pos)
    }

    pub fn has_boss_room(&self) -> bool {
        self.boss.is_some()
    }

    /// Records a branch room. Repeated centres stay in the list so the
    /// builder can stack spawners on them. The latest size wins.
    pub fn record_room(&mut self, center: GridPos, size: RoomSize) {
        self.room_centers.push(center);
        self.room_sizes.insert(center, size);
    }

    pub fn room_size_at(&self, center: GridPos) -> Option<RoomSize> {
        self.room_sizes.get(&center).copied()
    }

    /// 4-connected flood fill through floor cells.
    pub fn reachable_from(&self, start: GridPos) -> BTreeSet<GridPos> {
        let mut seen = BTreeSet::new();
        if !self.is_floor(start) {
            return seen;
        }
        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(pos) = queue.pop_front() {
            for dir in CARDINAL_DIRECTIONS {
                let next = pos + dir;
                if self.is_floor(next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// True when every floor cell is reachable from the origin.
    pub fn is_fully_connected(&self) -> bool {
        match self.floor.first() {
            Some(&first) => self.reachable_from(first).len() == self.floor.len(),
            None => true,
        }
    }
}
