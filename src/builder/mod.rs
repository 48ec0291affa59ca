//! Staged builder.
//!
//! Feeds a compiled [`BuildQueue`] to a [`PlacementSink`] in batches of
//! `blocks_per_frame` items. The host drives it: either call
//! [`StagedBuilder::tick`] once per frame with the frame delta, or
//! [`StagedBuilder::run_batch`] whenever it wants the next batch.
//! Each batch first checks the [`BuildToken`] and abandons the rest of the
//! queue once the dungeon has been destroyed.

pub mod catalog;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::build_queue::{BuildItem, BuildQueue, TileKind};
use crate::config::BuildConfig;
use crate::generation::{GeneratedDungeon, RoomSize};
use crate::grid::GridPos;

pub use catalog::PrefabCatalog;

/// World-space position handed to the sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl WorldPos {
    /// Grid `(x, y)` scaled by `spacing`; `z` is the height offset.
    pub fn from_grid(pos: GridPos, spacing: f32, z: f32) -> Self {
        Self {
            x: pos.x as f32 * spacing,
            y: pos.y as f32 * spacing,
            z,
        }
    }
}

/// One resolved placement request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement<'a> {
    pub grid: GridPos,
    pub kind: TileKind,
    pub prefab: &'a str,
    pub world: WorldPos,
}

/// Host capability that instantiates placed tiles.
pub trait PlacementSink {
    /// Opaque reference to whatever the sink created
    type Handle;

    /// Instantiates one tile. `None` means the sink declined the item.
    fn place(&mut self, placement: &Placement<'_>) -> Option<Self::Handle>;

    /// Called right after a spawner is placed on a known room centre.
    fn set_room_size(&mut self, _handle: &Self::Handle, _size: RoomSize) {}

    /// Called instead of placing a second spawner on an occupied cell.
    fn raise_spawner_level(&mut self, _handle: &Self::Handle) {}
}

/// Shared liveness flag for a dungeon instance. Cloned into every builder;
/// invalidating it cancels all builders created before the call.
#[derive(Debug, Clone, Default)]
pub struct BuildToken(Arc<AtomicU64>);

impl BuildToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.current() == ticket
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildState {
    Building,
    Finished,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A batch ran and items remain
    Progress { placed: usize, remaining: usize },
    /// Inter-batch delay has not elapsed yet
    Waiting,
    /// The queue is drained
    Finished,
    /// The token was invalidated; remaining items were discarded
    Cancelled,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub batches: usize,
    pub placed: BTreeMap<TileKind, usize>,
    /// No prefab resolved for the item's kind
    pub skipped_missing_prefab: usize,
    /// The sink returned no handle
    pub rejected_by_sink: usize,
    pub stacked_spawners: usize,
    pub discarded: usize,
}

impl BuildStats {
    pub fn total_placed(&self) -> usize {
        self.placed.values().sum()
    }

    pub fn placed_of(&self, kind: TileKind) -> usize {
        self.placed.get(&kind).copied().unwrap_or(0)
    }
}

pub struct StagedBuilder<H> {
    items: Vec<BuildItem>,
    cursor: usize,
    room_sizes: BTreeMap<GridPos, RoomSize>,
    config: BuildConfig,
    catalog: PrefabCatalog,
    rng: Xoshiro256PlusPlus,
    token: BuildToken,
    ticket: u64,
    since_last_batch: Duration,
    spawners: BTreeMap<GridPos, H>,
    stats: BuildStats,
    state: BuildState,
}

impl<H> StagedBuilder<H> {
    /// `seed` drives prefab variety only; the queue itself is fixed.
    pub fn new(
        queue: BuildQueue,
        room_sizes: BTreeMap<GridPos, RoomSize>,
        config: BuildConfig,
        catalog: PrefabCatalog,
        seed: u64,
        token: &BuildToken,
    ) -> Self {
        // separate stream from the layout draws of the same seed
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        rng.jump();
        Self {
            items: queue.items,
            cursor: 0,
            room_sizes,
            config,
            catalog,
            rng,
            token: token.clone(),
            ticket: token.current(),
            since_last_batch: Duration::ZERO,
            spawners: BTreeMap::new(),
            stats: BuildStats::default(),
            state: BuildState::Building,
        }
    }

    pub fn for_dungeon(
        dungeon: &GeneratedDungeon,
        config: BuildConfig,
        catalog: PrefabCatalog,
        token: &BuildToken,
    ) -> Self {
        Self::new(
            dungeon.queue.clone(),
            dungeon.layout.room_sizes.clone(),
            config,
            catalog,
            dungeon.seed,
            token,
        )
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn remaining(&self) -> usize {
        self.items.len() - self.cursor
    }

    /// Fraction of the queue processed, 1.0 when empty.
    pub fn progress(&self) -> f32 {
        if self.items.is_empty() {
            1.0
        } else {
            self.cursor as f32 / self.items.len() as f32
        }
    }

    pub fn is_done(&self) -> bool {
        self.state != BuildState::Building
    }

    /// Handle of the spawner placed at `pos`, if any.
    pub fn spawner_at(&self, pos: GridPos) -> Option<&H> {
        self.spawners.get(&pos)
    }

    fn cancel(&mut self) {
        self.stats.discarded = self.remaining();
        self.cursor = self.items.len();
        self.state = BuildState::Cancelled;
        info!(
            discarded = self.stats.discarded,
            placed = self.stats.total_placed(),
            "Staged build cancelled"
        );
    }

    /// Checks the token without building anything. True once cancelled.
    pub fn check_cancelled(&mut self) -> bool {
        if self.state == BuildState::Building && !self.token.is_current(self.ticket) {
            self.cancel();
        }
        self.state == BuildState::Cancelled
    }

    fn build_item<S>(&mut self, item: BuildItem, sink: &mut S)
    where
        S: PlacementSink<Handle = H> + ?Sized,
    {
        if item.kind == TileKind::Spawner {
            if let Some(existing) = self.spawners.get(&item.pos) {
                sink.raise_spawner_level(existing);
                self.stats.stacked_spawners += 1;
                return;
            }
        }

        let Some(prefab) = self.catalog.resolve(item.kind, &self.config, &mut self.rng) else {
            self.stats.skipped_missing_prefab += 1;
            return;
        };

        let height = if item.kind == TileKind::Spawner {
            self.config.spawner_height
        } else {
            0.0
        };
        let placement = Placement {
            grid: item.pos,
            kind: item.kind,
            prefab,
            world: WorldPos::from_grid(item.pos, self.config.spacing, height),
        };

        let Some(handle) = sink.place(&placement) else {
            self.stats.rejected_by_sink += 1;
            return;
        };
        *self.stats.placed.entry(item.kind).or_insert(0) += 1;

        if item.kind == TileKind::Spawner {
            if let Some(size) = self.room_sizes.get(&item.pos) {
                sink.set_room_size(&handle, *size);
            }
            self.spawners.insert(item.pos, handle);
        }
    }

    /// Processes the next batch immediately.
    pub fn run_batch<S>(&mut self, sink: &mut S) -> BatchOutcome
    where
        S: PlacementSink<Handle = H> + ?Sized,
    {
        if self.check_cancelled() {
            return BatchOutcome::Cancelled;
        }
        if self.state == BuildState::Finished {
            return BatchOutcome::Finished;
        }

        let end = (self.cursor + self.config.blocks_per_frame.max(1)).min(self.items.len());
        let start = self.cursor;
        for i in start..end {
            let item = self.items[i];
            self.build_item(item, sink);
        }
        self.cursor = end;
        self.stats.batches += 1;
        self.since_last_batch = Duration::ZERO;
        trace!(batch = self.stats.batches, placed = end - start, "Batch built");

        if self.cursor >= self.items.len() {
            self.state = BuildState::Finished;
            info!(
                placed = self.stats.total_placed(),
                skipped = self.stats.skipped_missing_prefab,
                stacked = self.stats.stacked_spawners,
                batches = self.stats.batches,
                "Staged build finished"
            );
            return BatchOutcome::Finished;
        }
        BatchOutcome::Progress {
            placed: end - start,
            remaining: self.remaining(),
        }
    }

    /// Advances the build clock by `delta`. The first batch runs at once;
    /// later batches wait for `block_build_delay` between them.
    pub fn tick<S>(&mut self, delta: Duration, sink: &mut S) -> BatchOutcome
    where
        S: PlacementSink<Handle = H> + ?Sized,
    {
        if self.state == BuildState::Building && self.stats.batches > 0 {
            self.since_last_batch += delta;
            if self.since_last_batch < self.config.block_build_delay() {
                return BatchOutcome::Waiting;
            }
        }
        self.run_batch(sink)
    }

    /// Runs every remaining batch without waiting.
    pub fn drain<S>(&mut self, sink: &mut S) -> BatchOutcome
    where
        S: PlacementSink<Handle = H> + ?Sized,
    {
        loop {
            match self.run_batch(sink) {
                BatchOutcome::Progress { .. } | BatchOutcome::Waiting => continue,
                done => {
                    debug!(batches = self.stats.batches, "Build drained");
                    return done;
                }
            }
        }
    }
}

/// Sink that records every call. Useful for headless runs and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub placed: Vec<RecordedPlacement>,
    pub room_sizes: BTreeMap<usize, RoomSize>,
    pub spawner_levels: BTreeMap<usize, u32>,
    /// Kinds the sink refuses to place
    pub refuse: Vec<TileKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedPlacement {
    pub grid: GridPos,
    pub kind: TileKind,
    pub prefab: String,
    pub world: WorldPos,
}

impl PlacementSink for RecordingSink {
    type Handle = usize;

    fn place(&mut self, placement: &Placement<'_>) -> Option<usize> {
        if self.refuse.contains(&placement.kind) {
            return None;
        }
        let index = self.placed.len();
        self.placed.push(RecordedPlacement {
            grid: placement.grid,
            kind: placement.kind,
            prefab: placement.prefab.to_string(),
            world: placement.world,
        });
        if placement.kind == TileKind::Spawner {
            self.spawner_levels.insert(index, 1);
        }
        Some(index)
    }

    fn set_room_size(&mut self, handle: &usize, size: RoomSize) {
        self.room_sizes.insert(*handle, size);
    }

    fn raise_spawner_level(&mut self, handle: &usize) {
        *self.spawner_levels.entry(*handle).or_insert(1) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_queue::BuildItem;

    fn queue_of(items: &[(i32, i32, TileKind)]) -> BuildQueue {
        BuildQueue {
            items: items
                .iter()
                .map(|&(x, y, k)| BuildItem::new(GridPos::new(x, y), k))
                .collect(),
        }
    }

    fn floors(n: i32) -> BuildQueue {
        queue_of(&(0..n).map(|x| (x, 0, TileKind::Floor)).collect::<Vec<_>>())
    }

    fn config(blocks: usize) -> BuildConfig {
        BuildConfig {
            blocks_per_frame: blocks,
            block_build_delay_secs: 0.1,
            ..BuildConfig::default()
        }
    }

    fn builder(queue: BuildQueue, blocks: usize, token: &BuildToken) -> StagedBuilder<usize> {
        StagedBuilder::new(
            queue,
            BTreeMap::new(),
            config(blocks),
            PrefabCatalog::standard(),
            1,
            token,
        )
    }

    #[test]
    fn test_batches_respect_blocks_per_frame() {
        let token = BuildToken::new();
        let mut b = builder(floors(12), 5, &token);
        let mut sink = RecordingSink::default();
        assert_eq!(
            b.run_batch(&mut sink),
            BatchOutcome::Progress { placed: 5, remaining: 7 }
        );
        assert_eq!(
            b.run_batch(&mut sink),
            BatchOutcome::Progress { placed: 5, remaining: 2 }
        );
        assert_eq!(b.run_batch(&mut sink), BatchOutcome::Finished);
        assert_eq!(sink.placed.len(), 12);
        assert_eq!(b.stats().batches, 3);
        assert_eq!(b.run_batch(&mut sink), BatchOutcome::Finished);
    }

    #[test]
    fn test_tick_waits_between_batches() {
        let token = BuildToken::new();
        let mut b = builder(floors(10), 5, &token);
        let mut sink = RecordingSink::default();
        assert!(matches!(
            b.tick(Duration::from_millis(16), &mut sink),
            BatchOutcome::Progress { .. }
        ));
        assert_eq!(b.tick(Duration::from_millis(50), &mut sink), BatchOutcome::Waiting);
        assert_eq!(sink.placed.len(), 5);
        assert_eq!(b.tick(Duration::from_millis(60), &mut sink), BatchOutcome::Finished);
        assert_eq!(sink.placed.len(), 10);
    }

    #[test]
    fn test_world_coordinates() {
        let token = BuildToken::new();
        let queue = queue_of(&[(2, -3, TileKind::Floor), (4, 4, TileKind::Spawner)]);
        let mut b = builder(queue, 10, &token);
        let mut sink = RecordingSink::default();
        b.drain(&mut sink);
        assert_eq!(sink.placed[0].world, WorldPos { x: 3.0, y: -4.5, z: 0.0 });
        assert_eq!(sink.placed[1].world, WorldPos { x: 6.0, y: 6.0, z: 0.5 });
    }

    #[test]
    fn test_invalidated_token_cancels_between_batches() {
        let token = BuildToken::new();
        let mut b = builder(floors(10), 4, &token);
        let mut sink = RecordingSink::default();
        b.run_batch(&mut sink);
        token.invalidate();
        assert_eq!(b.run_batch(&mut sink), BatchOutcome::Cancelled);
        assert_eq!(sink.placed.len(), 4);
        assert_eq!(b.stats().discarded, 6);
        assert_eq!(b.state(), BuildState::Cancelled);
        assert_eq!(b.drain(&mut sink), BatchOutcome::Cancelled);
    }

    #[test]
    fn test_missing_prefab_skips_only_that_item() {
        let token = BuildToken::new();
        let queue = queue_of(&[
            (0, 0, TileKind::Floor),
            (1, 0, TileKind::Wall),
            (2, 0, TileKind::Floor),
        ]);
        let catalog = PrefabCatalog {
            wall: None,
            ..PrefabCatalog::standard()
        };
        let mut b = StagedBuilder::new(queue, BTreeMap::new(), config(10), catalog, 1, &token);
        let mut sink = RecordingSink::default();
        assert_eq!(b.drain(&mut sink), BatchOutcome::Finished);
        assert_eq!(sink.placed.len(), 2);
        assert_eq!(b.stats().skipped_missing_prefab, 1);
    }

    #[test]
    fn test_sink_rejection_is_counted() {
        let token = BuildToken::new();
        let mut b = builder(
            queue_of(&[(0, 0, TileKind::Floor), (1, 0, TileKind::Door)]),
            10,
            &token,
        );
        let mut sink = RecordingSink {
            refuse: vec![TileKind::Door],
            ..RecordingSink::default()
        };
        b.drain(&mut sink);
        assert_eq!(b.stats().rejected_by_sink, 1);
        assert_eq!(b.stats().placed_of(TileKind::Floor), 1);
    }

    #[test]
    fn test_duplicate_spawner_raises_level() {
        let token = BuildToken::new();
        let center = GridPos::new(5, 5);
        let queue = queue_of(&[
            (5, 5, TileKind::Spawner),
            (9, 9, TileKind::Spawner),
            (5, 5, TileKind::Spawner),
        ]);
        let sizes = BTreeMap::from([(center, RoomSize::new(7, 5))]);
        let mut b =
            StagedBuilder::new(queue, sizes, config(10), PrefabCatalog::standard(), 1, &token);
        let mut sink = RecordingSink::default();
        b.drain(&mut sink);

        assert_eq!(sink.placed.len(), 2);
        assert_eq!(b.stats().stacked_spawners, 1);
        let handle = *b.spawner_at(center).unwrap();
        assert_eq!(sink.spawner_levels[&handle], 2);
        assert_eq!(sink.room_sizes.get(&handle), Some(&RoomSize::new(7, 5)));
        // no known room at (9, 9)
        assert_eq!(sink.room_sizes.len(), 1);
    }

    #[test]
    fn test_empty_queue_finishes_immediately() {
        let token = BuildToken::new();
        let mut b = builder(BuildQueue::default(), 5, &token);
        assert_eq!(b.progress(), 1.0);
        assert_eq!(b.run_batch(&mut RecordingSink::default()), BatchOutcome::Finished);
    }
}
