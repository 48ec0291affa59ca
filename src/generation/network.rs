//! Node network: rejection-sampled vertices joined into a connected graph.

use petgraph::visit::Bfs;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::boss_room::{is_blocked, BossGuard};
use super::layout::Layout;
use super::rolls::{percent_roll, pick_index};
use crate::config::DungeonConfig;
use crate::constants::{NEAREST_NEIGHBOURS, NODE_ATTEMPTS_PER_NODE};
use crate::grid::GridPos;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    pub requested: usize,
    pub placed: usize,
    /// Every sampled candidate, accepted or not
    pub attempts: usize,
}

impl NodeStats {
    pub fn is_underfilled(&self) -> bool {
        self.placed < self.requested
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeStats {
    pub nearest: usize,
    pub extra: usize,
    pub bridges: usize,
}

impl EdgeStats {
    pub fn total(&self) -> usize {
        self.nearest + self.extra + self.bridges
    }
}

fn is_valid_node(layout: &Layout, guard: Option<BossGuard>, pos: GridPos, min_distance: i32) -> bool {
    !is_blocked(guard, pos) && layout.nodes.iter().all(|&n| !pos.is_within(n, min_distance))
}

/// Places the origin, then samples `[-map_size, map_size]²` until the node
/// count is reached or `node_count * 50` candidates have been drawn.
pub fn sample_nodes<R: Rng + ?Sized>(
    layout: &mut Layout,
    config: &DungeonConfig,
    guard: Option<BossGuard>,
    rng: &mut R,
) -> NodeStats {
    let net = &config.network;
    layout.add_node(GridPos::ZERO);

    let extent = net.map_size.max(0);
    let budget = net.node_count.saturating_mul(NODE_ATTEMPTS_PER_NODE);
    let mut attempts = 0;
    while layout.nodes.len() < net.node_count && attempts < budget {
        let candidate = GridPos::new(
            rng.gen_range(-extent..=extent),
            rng.gen_range(-extent..=extent),
        );
        if is_valid_node(layout, guard, candidate, net.min_node_distance) {
            layout.add_node(candidate);
        }
        attempts += 1;
    }

    let stats = NodeStats {
        requested: net.node_count,
        placed: layout.nodes.len(),
        attempts,
    };
    if stats.is_underfilled() {
        warn!(
            requested = stats.requested,
            placed = stats.placed,
            underfilled = true,
            "Node budget exhausted before reaching the requested count"
        );
    } else {
        debug!(placed = stats.placed, attempts, "Network nodes sampled");
    }
    stats
}

/// Up to `count` other nodes, nearest first. Equal distances keep node order.
pub fn nearest_nodes(layout: &Layout, from: GridPos, count: usize) -> Vec<GridPos> {
    let mut others: Vec<GridPos> = layout.nodes.iter().copied().filter(|&n| n != from).collect();
    others.sort_by_key(|&n| from.distance_squared(n));
    others.truncate(count);
    others
}

/// Links every node to its four nearest neighbours.
pub fn connect_nearest(layout: &mut Layout) -> usize {
    let mut added = 0;
    for node in layout.nodes.clone() {
        for other in nearest_nodes(layout, node, NEAREST_NEIGHBOURS) {
            if layout.connect(node, other) {
                added += 1;
            }
        }
    }
    added
}

/// The node closest to `target`; the earliest one wins ties.
pub fn nearest_node(layout: &Layout, target: GridPos) -> Option<GridPos> {
    layout
        .nodes
        .iter()
        .copied()
        .min_by_key(|&n| n.distance_squared(target))
}

/// Draws `extra_connections` random node pairs and links each with
/// `connection_chance` percent probability. Self-pairs and existing
/// edges skip the chance roll.
pub fn add_extra_connections<R: Rng + ?Sized>(
    layout: &mut Layout,
    config: &DungeonConfig,
    rng: &mut R,
) -> usize {
    let count = layout.nodes.len();
    if count == 0 {
        return 0;
    }
    let mut added = 0;
    for _ in 0..config.network.extra_connections {
        let a = layout.nodes[pick_index(rng, count)];
        let b = layout.nodes[pick_index(rng, count)];
        if a != b && !layout.is_connected(a, b) && percent_roll(rng, config.network.connection_chance)
        {
            layout.connect(a, b);
            added += 1;
        }
    }
    added
}

fn origin_component(layout: &Layout) -> BTreeSet<GridPos> {
    let mut component = BTreeSet::new();
    let Some(&start) = layout.nodes.first() else {
        return component;
    };
    let mut bfs = Bfs::new(&layout.connections, start);
    while let Some(node) = bfs.next(&layout.connections) {
        component.insert(node);
    }
    component
}

/// Joins every component to the origin's by repeatedly linking the closest
/// pair across the cut. Uses no randomness.
pub fn bridge_components(layout: &mut Layout) -> usize {
    let mut bridges = 0;
    loop {
        let component = origin_component(layout);
        if component.len() >= layout.nodes.len() {
            break;
        }

        let mut best: Option<(i64, GridPos, GridPos)> = None;
        for &a in layout.nodes.iter().filter(|n| component.contains(*n)) {
            for &b in layout.nodes.iter().filter(|n| !component.contains(*n)) {
                let d = a.distance_squared(b);
                if best.map_or(true, |(bd, _, _)| d < bd) {
                    best = Some((d, a, b));
                }
            }
        }

        let Some((_, a, b)) = best else { break };
        debug!(from = %a, to = %b, "Bridging disconnected node component");
        layout.connect(a, b);
        bridges += 1;
    }
    bridges
}
