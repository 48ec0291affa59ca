//! One dungeon instance: generation, staged build and teardown.
//!
//! The session is owned by whoever hosts the dungeon and passed to the code
//! that needs it. A generation request while a dungeon is building or built
//! is ignored; `destroy` returns the session to idle.

use std::time::Duration;
use tracing::{debug, info};

use crate::builder::{BatchOutcome, BuildToken, PlacementSink, PrefabCatalog, StagedBuilder};
use crate::config::{BuildConfig, DungeonConfig, StagePreset};
use crate::generation::{generate_dungeon, GeneratedDungeon, GenerationReport, Layout, RoomSize};
use crate::grid::GridPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Building,
    Complete,
}

pub struct DungeonSession<H> {
    config: DungeonConfig,
    build: BuildConfig,
    catalog: PrefabCatalog,
    token: BuildToken,
    dungeon: Option<GeneratedDungeon>,
    builder: Option<StagedBuilder<H>>,
    state: SessionState,
}

impl<H> DungeonSession<H> {
    pub fn new(config: DungeonConfig, build: BuildConfig, catalog: PrefabCatalog) -> Self {
        Self {
            config,
            build,
            catalog,
            token: BuildToken::new(),
            dungeon: None,
            builder: None,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &DungeonConfig {
        &self.config
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }

    pub fn token(&self) -> &BuildToken {
        &self.token
    }

    /// Takes effect on the next generation.
    pub fn set_config(&mut self, config: DungeonConfig) {
        self.config = config;
    }

    pub fn set_build_config(&mut self, build: BuildConfig) {
        self.build = build;
    }

    pub fn set_catalog(&mut self, catalog: PrefabCatalog) {
        self.catalog = catalog;
    }

    pub fn apply_preset(&mut self, preset: &StagePreset) {
        debug!(preset = %preset.name, "Stage preset applied");
        self.config = preset.dungeon.clone();
    }

    /// Generates a dungeon and prepares its staged build. Returns `false`
    /// without doing anything when a dungeon already exists.
    pub fn request_generation(&mut self, seed: u64) -> bool {
        if self.state != SessionState::Idle {
            debug!(seed, state = ?self.state, "Generation request ignored");
            return false;
        }
        let dungeon = generate_dungeon(&self.config, seed);
        self.builder = Some(StagedBuilder::for_dungeon(
            &dungeon,
            self.build.clone(),
            self.catalog.clone(),
            &self.token,
        ));
        self.dungeon = Some(dungeon);
        self.state = SessionState::Building;
        true
    }

    fn settle(&mut self, outcome: BatchOutcome) -> BatchOutcome {
        if outcome == BatchOutcome::Finished && self.state == SessionState::Building {
            self.state = SessionState::Complete;
        }
        outcome
    }

    /// Advances the staged build. `None` when nothing is being built.
    pub fn tick<S>(&mut self, delta: Duration, sink: &mut S) -> Option<BatchOutcome>
    where
        S: PlacementSink<Handle = H> + ?Sized,
    {
        let outcome = self.builder.as_mut()?.tick(delta, sink);
        Some(self.settle(outcome))
    }

    /// Builds everything that is left at once.
    pub fn drain<S>(&mut self, sink: &mut S) -> Option<BatchOutcome>
    where
        S: PlacementSink<Handle = H> + ?Sized,
    {
        let outcome = self.builder.as_mut()?.drain(sink);
        Some(self.settle(outcome))
    }

    /// Cancels any build in flight and forgets the dungeon. Returns `false`
    /// when there was nothing to destroy.
    pub fn destroy(&mut self) -> bool {
        if self.state == SessionState::Idle {
            return false;
        }
        self.token.invalidate();
        if let Some(builder) = self.builder.as_mut() {
            builder.check_cancelled();
        }
        self.builder = None;
        self.dungeon = None;
        self.state = SessionState::Idle;
        info!("Dungeon destroyed");
        true
    }

    pub fn dungeon(&self) -> Option<&GeneratedDungeon> {
        self.dungeon.as_ref()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.dungeon.as_ref().map(|d| &d.layout)
    }

    pub fn report(&self) -> Option<&GenerationReport> {
        self.dungeon.as_ref().map(|d| &d.report)
    }

    pub fn builder(&self) -> Option<&StagedBuilder<H>> {
        self.builder.as_ref()
    }

    pub fn room_size_at(&self, center: GridPos) -> Option<RoomSize> {
        self.layout()?.room_size_at(center)
    }

    pub fn seed(&self) -> Option<u64> {
        self.dungeon.as_ref().map(|d| d.seed)
    }
}
