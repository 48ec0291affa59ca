//! Layout survey.
//!
//! Generates many dungeons in parallel from one base seed and summarises
//! how often each stage degraded: underfilled node sets, boss fallbacks,
//! truncated corridors and layouts whose floor is not one connected piece.
//! Useful for tuning a config before shipping it as a stage preset.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::DungeonConfig;
use crate::generation::{generate_dungeon, DungeonSeed};

#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub base_seed: u64,
    pub dungeon_count: u32,
    pub config: DungeonConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            base_seed: 42,
            dungeon_count: 200,
            config: DungeonConfig::default(),
        }
    }
}

/// Per-dungeon numbers kept by the survey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveySample {
    pub seed: u64,
    pub floor_cells: usize,
    pub rooms: usize,
    pub nodes_placed: usize,
    pub underfilled: bool,
    pub boss_fallback: bool,
    pub corridor_truncated: bool,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurveyGrade {
    /// No degraded layouts at all
    Clean,
    /// Under 5% degraded
    Acceptable,
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyReport {
    pub dungeon_count: u32,
    pub avg_floor_cells: f32,
    pub std_floor_cells: f32,
    pub min_floor_cells: usize,
    pub max_floor_cells: usize,
    pub avg_rooms: f32,
    pub avg_nodes: f32,
    pub underfilled: u32,
    pub boss_fallbacks: u32,
    pub truncated_corridors: u32,
    pub disconnected: u32,
    /// Smallest layouts first, at most five
    pub smallest: Vec<SurveySample>,
    pub grade: SurveyGrade,
}

impl SurveyReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Seed for the `index`-th dungeon of a survey
pub fn survey_seed(base_seed: u64, index: u32) -> u64 {
    DungeonSeed::new(base_seed).floor_hash(index)
}

fn sample(config: &DungeonConfig, seed: u64) -> SurveySample {
    let dungeon = generate_dungeon(config, seed);
    let report = &dungeon.report;
    SurveySample {
        seed,
        floor_cells: report.floor_cells,
        rooms: dungeon.layout.room_centers.len(),
        nodes_placed: report.nodes.placed,
        underfilled: report.nodes.is_underfilled(),
        boss_fallback: report.boss_fallback(),
        corridor_truncated: report.corridor_truncated(),
        connected: dungeon.layout.is_fully_connected(),
    }
}

pub fn run_survey(survey: &SurveyConfig) -> SurveyReport {
    let seeds: Vec<u64> = (0..survey.dungeon_count)
        .map(|i| survey_seed(survey.base_seed, i))
        .collect();

    let samples: Vec<SurveySample> = seeds
        .par_iter()
        .map(|seed| sample(&survey.config, *seed))
        .collect();

    analyze_samples(&samples)
}

fn analyze_samples(samples: &[SurveySample]) -> SurveyReport {
    let count = samples.len();
    let tally = |f: fn(&SurveySample) -> bool| samples.iter().filter(|s| f(s)).count() as u32;

    let underfilled = tally(|s| s.underfilled);
    let boss_fallbacks = tally(|s| s.boss_fallback);
    let truncated_corridors = tally(|s| s.corridor_truncated);
    let disconnected = tally(|s| !s.connected);
    let degraded = tally(|s| s.underfilled || s.boss_fallback || s.corridor_truncated || !s.connected);

    let (avg, std_dev, avg_rooms, avg_nodes) = if count == 0 {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        let n = count as f32;
        let avg = samples.iter().map(|s| s.floor_cells as f32).sum::<f32>() / n;
        let variance = samples
            .iter()
            .map(|s| (s.floor_cells as f32 - avg).powi(2))
            .sum::<f32>()
            / n;
        let rooms = samples.iter().map(|s| s.rooms as f32).sum::<f32>() / n;
        let nodes = samples.iter().map(|s| s.nodes_placed as f32).sum::<f32>() / n;
        (avg, variance.sqrt(), rooms, nodes)
    };

    let mut smallest = samples.to_vec();
    smallest.sort_by_key(|s| (s.floor_cells, s.seed));
    smallest.truncate(5);

    let grade = if degraded == 0 {
        SurveyGrade::Clean
    } else if (degraded as f32) < count as f32 * 0.05 {
        SurveyGrade::Acceptable
    } else {
        SurveyGrade::Degraded
    };

    SurveyReport {
        dungeon_count: count as u32,
        avg_floor_cells: avg,
        std_floor_cells: std_dev,
        min_floor_cells: samples.iter().map(|s| s.floor_cells).min().unwrap_or(0),
        max_floor_cells: samples.iter().map(|s| s.floor_cells).max().unwrap_or(0),
        avg_rooms,
        avg_nodes,
        underfilled,
        boss_fallbacks,
        truncated_corridors,
        disconnected,
        smallest,
        grade,
    }
}
