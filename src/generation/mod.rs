//! Dungeon layout generation.
//!
//! Stages run strictly forward and only append to the shared [`Layout`]:
//! boss room, node network, tunnels, boss corridor, branches. The finished
//! layout is compiled into a [`BuildQueue`] for the staged builder.

pub mod boss_room;
pub mod carver;
pub mod layout;
pub mod network;
pub mod rolls;

use bevy::prelude::Resource;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::{info, warn};

use crate::build_queue::{self, BuildQueue};
use crate::config::DungeonConfig;
use crate::grid::GridPos;
use crate::logging::TimingSpan;

pub use boss_room::BossPlacement;
pub use carver::{BranchStats, CorridorOutcome, TunnelStats};
pub use layout::{BossRoom, Layout, RoomSize};
pub use network::{EdgeStats, NodeStats};

/// Root seed for a run of dungeon floors.
#[derive(Resource, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonSeed {
    pub seed: u64,
}

impl Default for DungeonSeed {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl DungeonSeed {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Deterministic per-floor seed from the root seed and floor level
    pub fn floor_hash(&self, floor_level: u32) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(floor_level.to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

/// What each stage did, including every degraded outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub boss_placement: Option<BossPlacement>,
    pub nodes: NodeStats,
    pub edges: EdgeStats,
    pub tunnels_carved: usize,
    /// Tunnels the boss zone cut
    pub tunnels_severed: usize,
    /// Nodes with no floor path from the origin once carving is done
    pub unreachable_nodes: usize,
    pub boss_corridor: Option<CorridorOutcome>,
    pub branches: BranchStats,
    pub floor_cells: usize,
}

impl GenerationReport {
    pub fn boss_fallback(&self) -> bool {
        self.boss_placement.is_some_and(|p| p.is_fallback())
    }

    pub fn corridor_truncated(&self) -> bool {
        self.boss_corridor.is_some_and(|c| c.truncated)
    }
}

/// A finished run: layout, compiled queue and report.
#[derive(Debug, Clone)]
pub struct GeneratedDungeon {
    pub seed: u64,
    pub layout: Layout,
    pub queue: BuildQueue,
    pub report: GenerationReport,
}

/// Runs every layout stage with the supplied random source. The same
/// config and draw sequence always produce the same layout.
pub fn generate_layout_with<R: Rng + ?Sized>(
    config: &DungeonConfig,
    rng: &mut R,
) -> (Layout, GenerationReport) {
    let mut layout = Layout::new();
    let mut report = GenerationReport::default();

    layout.stamp_floor(GridPos::ZERO);

    if config.boss_room.enabled {
        report.boss_placement = Some(boss_room::place_boss_room(&mut layout, config, rng));
    }
    let guard = boss_room::BossGuard::for_layout(&layout, config);

    report.nodes = network::sample_nodes(&mut layout, config, guard, rng);
    report.edges.nearest = network::connect_nearest(&mut layout);

    if let Some(boss) = layout.boss {
        if let Some(start) = network::nearest_node(&layout, boss.center) {
            report.boss_corridor = carver::carve_boss_corridor(&mut layout, start, config);
        }
    }

    report.edges.extra = network::add_extra_connections(&mut layout, config, rng);
    report.edges.bridges = network::bridge_components(&mut layout);

    for node in layout.nodes.clone() {
        layout.stamp_floor(node);
    }
    let tunnels = carver::carve_network_tunnels(&mut layout, config, guard, rng);
    report.tunnels_carved = tunnels.carved;
    report.tunnels_severed = tunnels.severed;
    report.branches = carver::carve_protruding_rooms(&mut layout, config, guard, rng);
    report.floor_cells = layout.floor.len();

    let reachable = layout.reachable_from(GridPos::ZERO);
    report.unreachable_nodes = layout
        .nodes
        .iter()
        .filter(|node| !reachable.contains(node))
        .count();
    if report.unreachable_nodes > 0 {
        warn!(
            unreachable = report.unreachable_nodes,
            severed = report.tunnels_severed,
            disconnected = true,
            "Boss zone cut nodes off from the origin"
        );
    }

    (layout, report)
}

/// Generates and compiles a dungeon from a `u64` seed.
pub fn generate_dungeon(config: &DungeonConfig, seed: u64) -> GeneratedDungeon {
    let _span = TimingSpan::new("generate_dungeon");
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let (layout, report) = generate_layout_with(config, &mut rng);
    let queue = build_queue::compile(&layout, config.boss_room.spawn_inside);

    info!(
        seed,
        nodes = report.nodes.placed,
        edges = report.edges.total(),
        rooms = layout.room_centers.len(),
        floor = report.floor_cells,
        items = queue.len(),
        "Dungeon generated"
    );

    GeneratedDungeon {
        seed,
        layout,
        queue,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_queue::TileKind;

    #[test]
    fn test_floor_hash_deterministic() {
        let seed = DungeonSeed::new(12345);
        assert_eq!(seed.floor_hash(1), seed.floor_hash(1));
        assert_ne!(
            seed.floor_hash(1),
            seed.floor_hash(2),
            "different floors should get different seeds"
        );
        assert_ne!(seed.floor_hash(1), DungeonSeed::new(54321).floor_hash(1));
    }

    #[test]
    fn test_same_seed_same_dungeon() {
        let config = DungeonConfig::default().with_boss_room(true);
        let a = generate_dungeon(&config, 777);
        let b = generate_dungeon(&config, 777);
        assert_eq!(a.layout.floor, b.layout.floor);
        assert_eq!(a.layout.nodes, b.layout.nodes);
        assert_eq!(a.queue, b.queue);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn test_different_seeds_differ() {
        let config = DungeonConfig::default();
        let a = generate_dungeon(&config, 1);
        let b = generate_dungeon(&config, 2);
        assert_ne!(a.layout.floor, b.layout.floor);
    }

    #[test]
    fn test_reference_scenario_without_boss() {
        let config = DungeonConfig::default();
        let dungeon = generate_dungeon(&config, 2024);
        assert!(dungeon.layout.is_floor(GridPos::ZERO));
        assert!(dungeon.report.tunnels_carved >= dungeon.layout.nodes.len() - 1);
        assert_eq!(dungeon.queue.count(TileKind::BossFloor), 0);
        assert_eq!(dungeon.queue.count(TileKind::BossDoor), 0);
        assert!(dungeon.report.boss_placement.is_none());
        assert!(dungeon.layout.is_fully_connected());
    }

    #[test]
    fn test_reference_scenario_with_boss() {
        let config = DungeonConfig::default().with_boss_room(true);
        let dungeon = generate_dungeon(&config, 99);
        let boss = dungeon.layout.boss.expect("boss room enabled");
        assert_eq!(
            dungeon.layout.room_size_at(boss.center),
            Some(RoomSize::square(20))
        );
        if !dungeon.report.boss_fallback() {
            assert!(boss.center.distance(GridPos::ZERO) >= 35.0 - 1.5);
        }
        let corridor = dungeon.report.boss_corridor.expect("corridor carved");
        if !corridor.truncated {
            assert!(dungeon.queue.count(TileKind::BossDoor) >= 1);
        }
    }

    #[test]
    fn test_boss_room_opens_only_onto_its_corridor() {
        let config = DungeonConfig::default().with_boss_room(true);
        for seed in 0..40 {
            let dungeon = generate_dungeon(&config, seed);
            let layout = &dungeon.layout;
            for door in dungeon
                .queue
                .positions(TileKind::Door)
                .chain(dungeon.queue.positions(TileKind::BossDoor))
            {
                assert!(
                    layout.boss_corridor.contains(&door),
                    "seed {seed}: opening {door} not carved by the boss corridor"
                );
            }
            if !dungeon.report.corridor_truncated() {
                assert!(dungeon.queue.count(TileKind::BossDoor) >= 1, "seed {seed}");
            }
        }
    }

    #[test]
    fn test_plain_layout_has_nothing_severed() {
        let dungeon = generate_dungeon(&DungeonConfig::default(), 11);
        assert_eq!(dungeon.report.tunnels_severed, 0);
        assert_eq!(dungeon.report.unreachable_nodes, 0);
    }

    #[test]
    fn test_every_node_is_floor() {
        let dungeon = generate_dungeon(&DungeonConfig::default(), 5);
        for node in &dungeon.layout.nodes {
            assert!(dungeon.layout.is_floor(*node));
        }
    }
}
