//! Text rendering of compiled dungeons.
//!
//! One character per grid cell, north at the top. Items later in the
//! queue draw over earlier ones, so doors and spawners show on top of the
//! floor they sit on.

use crate::build_queue::{BuildQueue, TileKind};

pub const EMPTY_GLYPH: char = ' ';

pub fn glyph(kind: TileKind) -> char {
    match kind {
        TileKind::Floor => '.',
        TileKind::RoomFloor => ',',
        TileKind::BossFloor => 'B',
        TileKind::Wall => '#',
        TileKind::Door => '+',
        TileKind::BossDoor => 'D',
        TileKind::Spawner => 'S',
    }
}

/// `glyph  name` lines for every tile kind
pub fn legend() -> String {
    TileKind::ALL
        .iter()
        .map(|k| format!("{}  {}", glyph(*k), k.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_ascii(queue: &BuildQueue) -> String {
    let Some(first) = queue.iter().next() else {
        return String::new();
    };
    let (mut min, mut max) = (first.pos, first.pos);
    for item in queue.iter() {
        min.x = min.x.min(item.pos.x);
        min.y = min.y.min(item.pos.y);
        max.x = max.x.max(item.pos.x);
        max.y = max.y.max(item.pos.y);
    }

    let width = (max.x - min.x + 1) as usize;
    let height = (max.y - min.y + 1) as usize;
    let mut grid = vec![vec![EMPTY_GLYPH; width]; height];
    for item in queue.iter() {
        let col = (item.pos.x - min.x) as usize;
        let row = (max.y - item.pos.y) as usize;
        grid[row][col] = glyph(item.kind);
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
