//! Corridor carving: inter-node tunnels, the boss corridor and side
//! branches that end in rooms.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::boss_room::{is_blocked, BossGuard};
use super::layout::{Layout, RoomSize};
use super::rolls::{percent_roll, pick_index, range_inclusive};
use crate::config::DungeonConfig;
use crate::constants::{
    BOSS_APPROACH_MARGIN, BOSS_CORRIDOR_ITERATION_FACTOR, MIN_BRANCH_WIDTH, ROOM_OFFSET_FROM_BRANCH,
};
use crate::grid::{GridPos, ALL_DIRECTIONS};

/// Cells of a strip `width` wide, centred on `center` and perpendicular to
/// the direction of travel.
fn cross_section(center: GridPos, width: i32, moving_along_x: bool) -> impl Iterator<Item = GridPos> {
    let half = width / 2;
    (-half..=half).map(move |w| {
        if moving_along_x {
            center + GridPos::new(0, w)
        } else {
            center + GridPos::new(w, 0)
        }
    })
}

// =====================================================
// Inter-node tunnels
// =====================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelStats {
    pub carved: usize,
    /// Tunnels that lost at least one segment to the boss zone
    pub severed: usize,
}

/// Stamps one tunnel cross-section. A segment centred in the boss zone is
/// dropped whole; otherwise only cells on the boss square or its wall
/// ring are left out. Returns false when the segment was dropped.
fn stamp_tunnel_segment(
    layout: &mut Layout,
    center: GridPos,
    width: i32,
    moving_along_x: bool,
    guard: Option<BossGuard>,
) -> bool {
    if is_blocked(guard, center) {
        return false;
    }
    for cell in cross_section(center, width, moving_along_x) {
        if !guard.is_some_and(|g| g.touches_room(cell)) {
            layout.stamp_floor(cell);
        }
    }
    true
}

/// L-shaped tunnel: x first, then y. Width is fixed for the whole tunnel.
/// Returns true when the boss zone cut the tunnel.
pub fn carve_tunnel(
    layout: &mut Layout,
    from: GridPos,
    to: GridPos,
    width: i32,
    guard: Option<BossGuard>,
) -> bool {
    let mut severed = false;
    let mut current = from;
    while current.x != to.x {
        current = current.step_x_toward(to.x);
        severed |= !stamp_tunnel_segment(layout, current, width, true, guard);
    }
    while current.y != to.y {
        current = current.step_y_toward(to.y);
        severed |= !stamp_tunnel_segment(layout, current, width, false, guard);
    }
    severed
}

/// Carves one tunnel per undirected edge, visiting nodes in order and each
/// node's neighbours in insertion order.
pub fn carve_network_tunnels<R: Rng + ?Sized>(
    layout: &mut Layout,
    config: &DungeonConfig,
    guard: Option<BossGuard>,
    rng: &mut R,
) -> TunnelStats {
    let net = &config.network;
    let mut stats = TunnelStats::default();
    let mut processed: BTreeSet<(GridPos, GridPos)> = BTreeSet::new();
    for node in layout.nodes.clone() {
        for other in layout.neighbours(node) {
            let key = if node < other { (node, other) } else { (other, node) };
            if processed.insert(key) {
                let width = range_inclusive(rng, net.min_tunnel_width, net.max_tunnel_width);
                stats.carved += 1;
                if carve_tunnel(layout, node, other, width, guard) {
                    stats.severed += 1;
                    debug!(from = %node, to = %other, "Tunnel cut by the boss zone");
                }
            }
        }
    }
    stats
}

// =====================================================
// Boss corridor
// =====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorridorOutcome {
    pub start: GridPos,
    pub entrance: GridPos,
    pub steps: i32,
    /// Hit the iteration cap before reaching a boss-room cell
    pub truncated: bool,
}

/// Walks from `from` toward the boss centre: along x, then y, until within
/// `size/2 + 2`, then greedy single steps until standing on a boss-room
/// cell. That cell becomes the entrance.
pub fn carve_boss_corridor(layout: &mut Layout, from: GridPos, config: &DungeonConfig) -> Option<CorridorOutcome> {
    let boss = layout.boss?;
    let target = boss.center;
    let width = config.boss_room.corridor_width;
    let approach = boss.half_size() + BOSS_APPROACH_MARGIN;
    let max_steps = config
        .network
        .map_size
        .saturating_mul(BOSS_CORRIDOR_ITERATION_FACTOR);

    let arrived = |layout: &Layout, pos: GridPos| layout.is_boss_cell(pos);
    let near = |pos: GridPos| pos.distance_squared(target) <= (approach as i64).pow(2);

    let mut current = from;
    let mut steps = 0;

    while current.x != target.x && !near(current) && !arrived(layout, current) && steps < max_steps {
        current = current.step_x_toward(target.x);
        for cell in cross_section(current, width, true) {
            layout.stamp_corridor_cell(cell);
        }
        steps += 1;
    }

    while current.y != target.y && !near(current) && !arrived(layout, current) && steps < max_steps {
        current = current.step_y_toward(target.y);
        for cell in cross_section(current, width, false) {
            layout.stamp_corridor_cell(cell);
        }
        steps += 1;
    }

    while !arrived(layout, current) && steps < max_steps {
        let dir = current.direction_to(target);
        current += dir;
        for cell in cross_section(current, width, dir.x != 0) {
            layout.stamp_corridor_cell(cell);
        }
        steps += 1;
    }

    let truncated = !arrived(layout, current);
    if truncated {
        warn!(
            from = %from,
            reached = %current,
            max_steps,
            truncated = true,
            "Boss corridor hit the iteration cap"
        );
    } else {
        debug!(from = %from, entrance = %current, steps, "Boss corridor carved");
    }

    if let Some(boss) = layout.boss.as_mut() {
        boss.entrance = current;
    }
    Some(CorridorOutcome {
        start: from,
        entrance: current,
        steps,
        truncated,
    })
}

// =====================================================
// Branches & rooms
// =====================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchStats {
    /// Branch rolls that succeeded
    pub attempted: usize,
    /// Walks that ran their full length
    pub completed: usize,
    /// Walks that entered the boss exclusion zone
    pub cut_short: usize,
    pub rooms: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchOutcome {
    /// Node itself sits in the boss exclusion zone
    Blocked,
    CutShort,
    Completed { room: bool },
}

/// Perpendicular strip for axis directions, filled square for diagonals.
fn branch_section(center: GridPos, direction: GridPos, width: i32) -> Vec<GridPos> {
    if direction.is_diagonal() {
        let half = width / 2;
        let mut cells = Vec::with_capacity(((2 * half + 1) * (2 * half + 1)) as usize);
        for x in -half..=half {
            for y in -half..=half {
                cells.push(center + GridPos::new(x, y));
            }
        }
        cells
    } else {
        cross_section(center, width, direction.x != 0).collect()
    }
}

/// Stamps a `w × h` room (drawn from the room size range) around `center`,
/// skipping cells inside the boss exclusion zone.
pub fn stamp_room<R: Rng + ?Sized>(
    layout: &mut Layout,
    center: GridPos,
    config: &DungeonConfig,
    guard: Option<BossGuard>,
    rng: &mut R,
) -> RoomSize {
    let rooms = &config.rooms;
    let width = range_inclusive(rng, rooms.min_room_size, rooms.max_room_size);
    let height = range_inclusive(rng, rooms.min_room_size, rooms.max_room_size);
    let size = RoomSize::new(width, height);
    layout.record_room(center, size);

    for x in -width / 2..=width / 2 {
        for y in -height / 2..=height / 2 {
            let cell = center + GridPos::new(x, y);
            if !is_blocked(guard, cell) {
                layout.stamp_room_cell(cell);
            }
        }
    }
    size
}

fn carve_branch<R: Rng + ?Sized>(
    layout: &mut Layout,
    node: GridPos,
    config: &DungeonConfig,
    guard: Option<BossGuard>,
    rng: &mut R,
) -> BranchOutcome {
    if is_blocked(guard, node) {
        return BranchOutcome::Blocked;
    }
    let rooms = &config.rooms;
    let direction = ALL_DIRECTIONS[pick_index(rng, ALL_DIRECTIONS.len())];
    let width = range_inclusive(rng, rooms.min_branch_width, rooms.max_branch_width).max(MIN_BRANCH_WIDTH);

    let mut tip = node;
    for _ in 0..rooms.branch_length {
        tip += direction;
        if is_blocked(guard, tip) {
            return BranchOutcome::CutShort;
        }
        for cell in branch_section(tip, direction, width) {
            if !is_blocked(guard, cell) {
                layout.stamp_floor(cell);
            }
        }
    }

    let room_center = tip + direction * ROOM_OFFSET_FROM_BRANCH;
    if is_blocked(guard, room_center) {
        return BranchOutcome::Completed { room: false };
    }
    stamp_room(layout, room_center, config, guard, rng);
    BranchOutcome::Completed { room: true }
}

/// Grows between 1 and `max_rooms_per_node` branch rolls off every node.
pub fn carve_protruding_rooms<R: Rng + ?Sized>(
    layout: &mut Layout,
    config: &DungeonConfig,
    guard: Option<BossGuard>,
    rng: &mut R,
) -> BranchStats {
    let rooms = &config.rooms;
    let mut stats = BranchStats::default();
    for node in layout.nodes.clone() {
        let rolls = range_inclusive(rng, 1, rooms.max_rooms_per_node);
        for _ in 0..rolls {
            if !percent_roll(rng, rooms.branch_chance) {
                continue;
            }
            stats.attempted += 1;
            match carve_branch(layout, node, config, guard, rng) {
                BranchOutcome::Blocked => {}
                BranchOutcome::CutShort => stats.cut_short += 1,
                BranchOutcome::Completed { room } => {
                    stats.completed += 1;
                    stats.rooms += usize::from(room);
                }
            }
        }
    }
    debug!(
        attempted = stats.attempted,
        rooms = stats.rooms,
        cut_short = stats.cut_short,
        "Protruding rooms carved"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::boss_room::stamp_boss_room;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_tunnel_is_l_shaped_and_joined() {
        let mut layout = Layout::new();
        let from = GridPos::new(0, 0);
        let to = GridPos::new(6, 4);
        layout.stamp_floor(from);
        carve_tunnel(&mut layout, from, to, 1, None);
        assert!(layout.is_floor(GridPos::new(6, 0)), "corner cell");
        assert!(layout.is_floor(to));
        assert!(!layout.is_floor(GridPos::new(0, 4)), "y leg runs at the target x");
        assert!(layout.is_fully_connected());
        assert_eq!(layout.floor.len(), 1 + 6 + 4);
    }

    #[test]
    fn test_tunnel_cross_section_is_perpendicular() {
        let mut layout = Layout::new();
        carve_tunnel(&mut layout, GridPos::ZERO, GridPos::new(3, 0), 3, None);
        // vertical strip of three at each x step
        for x in 1..=3 {
            for y in -1..=1 {
                assert!(layout.is_floor(GridPos::new(x, y)));
            }
        }
        assert_eq!(layout.floor.len(), 9);
    }

    #[test]
    fn test_each_edge_carved_once() {
        let mut layout = Layout::new();
        for n in [(0, 0), (20, 0), (20, 20)] {
            layout.add_node(n.into());
        }
        layout.connect(GridPos::new(0, 0), GridPos::new(20, 0));
        layout.connect(GridPos::new(20, 0), GridPos::new(20, 20));
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(2);
        let stats = carve_network_tunnels(&mut layout, &DungeonConfig::default(), None, &mut rng);
        assert_eq!(stats.carved, 2);
        assert_eq!(stats.severed, 0);
    }

    #[test]
    fn test_tunnel_through_boss_room_is_severed() {
        let mut config = DungeonConfig::default().with_boss_room(true);
        config.network.min_node_distance = 0;
        config.boss_room.tunnel_buffer = 0;
        let mut layout = Layout::new();
        stamp_boss_room(&mut layout, GridPos::new(20, 0), 6);
        let guard = BossGuard::for_layout(&layout, &config);
        let boss_cells = layout.boss_room.clone();

        let severed = carve_tunnel(&mut layout, GridPos::ZERO, GridPos::new(40, 2), 5, guard);
        assert!(severed);
        for cell in &layout.floor {
            if !boss_cells.contains(cell) {
                assert!(
                    cell.chebyshev_distance(GridPos::new(20, 0)) > 4,
                    "tunnel cell {cell} touches the boss room"
                );
            }
        }
        assert!(layout.is_floor(GridPos::new(10, 2)), "tunnel kept outside the zone");
        assert!(layout.is_floor(GridPos::new(30, 0)));
    }

    #[test]
    fn test_tunnel_skirting_the_ring_keeps_its_centre_line() {
        let mut config = DungeonConfig::default().with_boss_room(true);
        config.network.min_node_distance = 0;
        config.boss_room.tunnel_buffer = 0;
        let mut layout = Layout::new();
        stamp_boss_room(&mut layout, GridPos::new(20, 0), 6);
        let guard = BossGuard::for_layout(&layout, &config);

        // centre line runs at y = 6, wide enough to reach into the ring at y = 4
        let severed = carve_tunnel(&mut layout, GridPos::new(0, 6), GridPos::new(40, 6), 5, guard);
        assert!(!severed);
        assert!(layout.is_floor(GridPos::new(20, 6)));
        assert!(layout.is_floor(GridPos::new(20, 5)));
        assert!(!layout.is_floor(GridPos::new(20, 4)), "wall ring stays closed");
        assert!(layout.is_floor(GridPos::new(10, 4)), "outside the ring the full width is carved");
    }

    #[test]
    fn test_boss_corridor_reaches_room() {
        let config = DungeonConfig::default().with_boss_room(true);
        let mut layout = Layout::new();
        stamp_boss_room(&mut layout, GridPos::new(40, 25), config.boss_room.size);
        layout.stamp_floor(GridPos::ZERO);
        let outcome = carve_boss_corridor(&mut layout, GridPos::ZERO, &config).unwrap();
        assert!(!outcome.truncated);
        assert!(layout.is_boss_cell(outcome.entrance));
        assert_eq!(layout.boss.unwrap().entrance, outcome.entrance);
        assert!(layout.reachable_from(GridPos::ZERO).contains(&GridPos::new(40, 25)));
        assert!(layout.boss_corridor.contains(&outcome.entrance));
        assert!(!layout.boss_corridor.contains(&GridPos::ZERO));
    }

    #[test]
    fn test_boss_corridor_truncates_at_cap() {
        let mut config = DungeonConfig::default().with_boss_room(true);
        config.network.map_size = 10;
        let mut layout = Layout::new();
        stamp_boss_room(&mut layout, GridPos::new(80, 0), 4);
        let outcome = carve_boss_corridor(&mut layout, GridPos::ZERO, &config).unwrap();
        assert!(outcome.truncated);
        assert_eq!(outcome.steps, 20);
        assert_eq!(outcome.entrance, GridPos::new(20, 0));
    }

    #[test]
    fn test_no_corridor_without_boss_room() {
        let mut layout = Layout::new();
        assert!(carve_boss_corridor(&mut layout, GridPos::ZERO, &DungeonConfig::default()).is_none());
    }

    #[test]
    fn test_room_size_within_range() {
        let config = DungeonConfig::default();
        let mut layout = Layout::new();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(5);
        let size = stamp_room(&mut layout, GridPos::new(10, 10), &config, None, &mut rng);
        assert!((5..=10).contains(&size.width));
        assert!((5..=10).contains(&size.height));
        let expected = ((size.width / 2) * 2 + 1) * ((size.height / 2) * 2 + 1);
        assert_eq!(layout.rooms.len() as i32, expected);
        assert_eq!(layout.room_centers, vec![GridPos::new(10, 10)]);
    }

    #[test]
    fn test_branches_stay_connected_to_node() {
        let mut config = DungeonConfig::default();
        config.rooms.branch_chance = 100;
        let mut layout = Layout::new();
        layout.add_node(GridPos::ZERO);
        layout.stamp_floor(GridPos::ZERO);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(17);
        let stats = carve_protruding_rooms(&mut layout, &config, None, &mut rng);
        assert!(stats.attempted >= 1);
        assert_eq!(stats.rooms, stats.attempted);
        assert!(layout.is_fully_connected());
    }

    #[test]
    fn test_branch_blocked_by_boss_zone() {
        let mut config = DungeonConfig::default().with_boss_room(true);
        config.rooms.branch_chance = 100;
        let mut layout = Layout::new();
        stamp_boss_room(&mut layout, GridPos::new(5, 0), config.boss_room.size);
        layout.add_node(GridPos::ZERO);
        let guard = BossGuard::for_layout(&layout, &config);
        let rooms_before = layout.rooms.len();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let stats = carve_protruding_rooms(&mut layout, &config, guard, &mut rng);
        assert_eq!(stats.rooms, 0);
        assert_eq!(stats.completed, 0);
        assert_eq!(layout.rooms.len(), rooms_before);
    }
}
