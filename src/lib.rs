//! Dungeon Core - Procedural Dungeon Layout Library
//!
//! Generates a grid dungeon from a seed and builds it in stages:
//! - Boss room placement on a ring around the origin
//! - Node network (sampled nodes, nearest-neighbour and extra edges)
//! - Tunnel, boss corridor and branch carving
//! - Build-queue compilation (floors, walls, doors, spawners)
//! - Staged, cancellable placement through a host sink
//! - Floor progression with stage presets
//! - Bevy plugin and C-ABI bridge for engine hosts

pub mod bridge;
pub mod build_queue;
pub mod builder;
pub mod config;
pub mod constants;
pub mod engine;
pub mod generation;
pub mod grid;
pub mod logging;
pub mod progression;
pub mod session;
pub mod survey;
pub mod visualization;
