use std::path::PathBuf;

use anyhow::{Context, Result};
use bevy::app::AppExit;
use bevy::prelude::*;
use clap::Parser;

use tracing::info;

use dungeon_core::config::{BuildConfig, DungeonConfig};
use dungeon_core::engine::{ActiveDungeon, DungeonPlugin, DungeonReadyEvent, GenerateDungeonEvent};
use dungeon_core::generation::DungeonSeed;
use dungeon_core::logging::{self, LoggingPlugin};
use dungeon_core::progression::StageSchedule;
use dungeon_core::survey::{run_survey, SurveyConfig};
use dungeon_core::visualization;

/// Generate a dungeon layout and print it as an ASCII map
#[derive(Parser, Debug)]
#[command(name = "dungeon-gen")]
#[command(version, about = "Procedural dungeon generator", long_about = None)]
struct Cli {
    /// Root seed (defaults to 42)
    seed: Option<u64>,

    /// Force the boss room on
    #[arg(long)]
    boss: bool,

    /// Dungeon preset (.ron or .json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stage schedule (.ron or .json); picks the preset for --floor
    #[arg(long, value_name = "PATH")]
    schedule: Option<PathBuf>,

    /// Floor level planned from the schedule
    #[arg(long, default_value_t = 0, requires = "schedule")]
    floor: u32,

    /// Generate COUNT dungeons in parallel and print aggregate JSON
    #[arg(long, value_name = "COUNT")]
    survey: Option<u32>,

    /// Place the whole queue in one frame
    #[arg(long)]
    fast: bool,

    /// Print the glyph legend under the map
    #[arg(long)]
    legend: bool,
}

#[derive(Resource)]
struct CliRequest {
    seed: u64,
    legend: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing_default();

    let mut seed = cli.seed.unwrap_or_else(|| DungeonSeed::default().seed);
    let mut config = match &cli.config {
        Some(path) => DungeonConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DungeonConfig::default(),
    };
    if let Some(path) = &cli.schedule {
        let schedule = StageSchedule::load(path)
            .with_context(|| format!("loading {}", path.display()))?;
        let plan = schedule
            .plan(&DungeonSeed::new(seed), cli.floor)
            .context("schedule has no stages")?;
        info!(
            floor = plan.floor_level,
            stage = %plan.stage_name,
            boss = plan.boss_floor,
            "Using stage schedule"
        );
        seed = plan.seed;
        config = plan.config;
    }
    if cli.boss {
        config = config.with_boss_room(true);
    }

    if let Some(count) = cli.survey {
        let report = run_survey(&SurveyConfig {
            base_seed: seed,
            dungeon_count: count,
            config,
        });
        println!("{}", report.to_json());
        return Ok(());
    }

    let build = if cli.fast {
        BuildConfig {
            blocks_per_frame: 10_000,
            block_build_delay_secs: 0.0,
            ..BuildConfig::default()
        }
    } else {
        BuildConfig::default()
    };

    App::new()
        .add_plugins(MinimalPlugins)
        .add_plugins(LoggingPlugin)
        .add_plugins(DungeonPlugin {
            config,
            build,
            catalog: None,
        })
        .insert_resource(CliRequest {
            seed,
            legend: cli.legend,
        })
        .add_systems(Startup, request_dungeon)
        .add_systems(PostUpdate, print_when_ready)
        .run();
    Ok(())
}

fn request_dungeon(request: Res<CliRequest>, mut events: EventWriter<GenerateDungeonEvent>) {
    events.send(GenerateDungeonEvent {
        seed: request.seed,
        preset: None,
    });
}

fn print_when_ready(
    mut ready: EventReader<DungeonReadyEvent>,
    active: Res<ActiveDungeon>,
    request: Res<CliRequest>,
    mut exit: EventWriter<AppExit>,
) {
    for event in ready.read() {
        if let Some(dungeon) = active.0.dungeon() {
            println!("{}", visualization::render_ascii(&dungeon.queue));
        }
        if request.legend {
            println!("\n{}", visualization::legend());
        }
        let report = &event.report;
        println!(
            "\nseed {} | {} tiles placed | {} nodes | {} rooms | boss fallback: {} | corridor truncated: {}",
            event.seed,
            event.placed,
            report.nodes.placed,
            report.branches.rooms,
            report.boss_fallback(),
            report.corridor_truncated(),
        );
        exit.send(AppExit::Success);
    }
}
