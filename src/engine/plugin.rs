use bevy::prelude::*;
use tracing::{debug, info};

use super::sink::{DungeonTile, EntitySink};
use crate::builder::{BatchOutcome, PrefabCatalog};
use crate::config::{BuildConfig, DungeonConfig, StagePreset};
use crate::generation::GenerationReport;
use crate::session::{DungeonSession, SessionState};

#[derive(Default)]
pub struct DungeonPlugin {
    pub config: DungeonConfig,
    pub build: BuildConfig,
    pub catalog: Option<PrefabCatalog>,
}

impl Plugin for DungeonPlugin {
    fn build(&self, app: &mut App) {
        let catalog = self.catalog.clone().unwrap_or_else(PrefabCatalog::standard);
        let session = DungeonSession::new(self.config.clone(), self.build.clone(), catalog);

        app.insert_resource(ActiveDungeon(session))
            .add_event::<GenerateDungeonEvent>()
            .add_event::<DestroyDungeonEvent>()
            .add_event::<DungeonReadyEvent>()
            .add_systems(
                Update,
                (
                    handle_destroy_requests,
                    handle_generate_requests,
                    advance_staged_build,
                )
                    .chain(),
            );
    }
}

/// The dungeon instance owned by this app
#[derive(Resource)]
pub struct ActiveDungeon(pub DungeonSession<Entity>);

/// Request a new dungeon. Ignored while one exists.
#[derive(Event, Debug, Clone)]
pub struct GenerateDungeonEvent {
    pub seed: u64,
    /// Applied before generating when the request is accepted
    pub preset: Option<StagePreset>,
}

/// Cancel the build in flight and despawn every tile.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct DestroyDungeonEvent;

/// Sent once the last batch has been placed.
#[derive(Event, Debug, Clone)]
pub struct DungeonReadyEvent {
    pub seed: u64,
    pub placed: usize,
    pub report: GenerationReport,
}

fn handle_destroy_requests(
    mut events: EventReader<DestroyDungeonEvent>,
    mut active: ResMut<ActiveDungeon>,
    tiles: Query<Entity, With<DungeonTile>>,
    mut commands: Commands,
) {
    if events.read().count() == 0 {
        return;
    }
    active.0.destroy();
    let mut despawned = 0;
    for entity in &tiles {
        commands.entity(entity).despawn();
        despawned += 1;
    }
    info!(despawned, "Dungeon tiles cleared");
}

fn handle_generate_requests(
    mut events: EventReader<GenerateDungeonEvent>,
    mut active: ResMut<ActiveDungeon>,
) {
    for event in events.read() {
        if active.0.state() != SessionState::Idle {
            debug!(seed = event.seed, "Dungeon already exists, request ignored");
            continue;
        }
        if let Some(preset) = &event.preset {
            active.0.apply_preset(preset);
        }
        active.0.request_generation(event.seed);
    }
}

fn advance_staged_build(
    time: Res<Time>,
    mut active: ResMut<ActiveDungeon>,
    mut commands: Commands,
    mut ready: EventWriter<DungeonReadyEvent>,
) {
    if active.0.state() != SessionState::Building {
        return;
    }
    let mut sink = EntitySink::new(&mut commands);
    if active.0.tick(time.delta(), &mut sink) != Some(BatchOutcome::Finished) {
        return;
    }

    let placed = active
        .0
        .builder()
        .map(|b| b.stats().total_placed())
        .unwrap_or(0);
    ready.send(DungeonReadyEvent {
        seed: active.0.seed().unwrap_or_default(),
        placed,
        report: active.0.report().cloned().unwrap_or_default(),
    });
}
