//! Centralized constants for the dungeon generator.
//!
//! Tunable values live in `config`; these are the fixed rules of the
//! algorithm that every stage preset shares.

// =====================================================
// Config limits
// =====================================================

/// Upper bound for every cell distance or extent in a config
pub const MAX_EXTENT: i32 = 4096;

/// Upper bound for `network.node_count`
pub const MAX_NODE_COUNT: usize = 2048;

// =====================================================
// Boss room
// =====================================================

/// Polar samples tried before falling back to `(min_distance_from_center, 0)`
pub const BOSS_PLACEMENT_ATTEMPTS: u32 = 100;

/// Extra cells kept free between the boss room (plus tunnel buffer) and the map edge
pub const BOSS_BOUNDARY_MARGIN: i32 = 3;

/// Straight corridor legs stop once within `boss_size / 2 + BOSS_APPROACH_MARGIN`
pub const BOSS_APPROACH_MARGIN: i32 = 2;

/// Corridor iteration cap: `map_size * BOSS_CORRIDOR_ITERATION_FACTOR`
pub const BOSS_CORRIDOR_ITERATION_FACTOR: i32 = 2;

/// Door openings closer than this to the corridor entrance become boss doors
pub const BOSS_DOOR_RADIUS: i32 = 3;

// =====================================================
// Node network
// =====================================================

/// Rejection-sampling budget per requested node
pub const NODE_ATTEMPTS_PER_NODE: usize = 50;

/// Every node links to this many nearest neighbours
pub const NEAREST_NEIGHBOURS: usize = 4;

// =====================================================
// Branches & rooms
// =====================================================

/// Branch corridors are never thinner than this
pub const MIN_BRANCH_WIDTH: i32 = 2;

/// A branch room is centred this many steps past the branch tip
pub const ROOM_OFFSET_FROM_BRANCH: i32 = 2;

/// Smallest room side that still overlaps the branch tip
pub const MIN_ROOM_SIDE: i32 = 3;

// =====================================================
// Staged build
// =====================================================

/// Upper bound for percentage rolls (`roll < chance` over `0..PERCENT`)
pub const PERCENT: i32 = 100;
