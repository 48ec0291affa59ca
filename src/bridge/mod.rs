//! FFI bridge: C ABI over the dungeon generator.
//!
//! Data crosses the boundary as JSON. Every function returning `*mut c_char`
//! hands out a heap string the caller must release with `free_string`;
//! null means the input could not be parsed or failed validation.

use serde::{Deserialize, Serialize};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::build_queue::TileKind;
use crate::builder::{PrefabCatalog, RecordedPlacement, RecordingSink, StagedBuilder};
use crate::builder::{BuildStats, BuildToken};
use crate::config::{BuildConfig, DungeonConfig};
use crate::generation::{generate_dungeon, BossRoom, DungeonSeed, GenerationReport};
use crate::logging;
use crate::progression::StageSchedule;
use crate::survey::{run_survey, SurveyConfig};
use crate::visualization;

// ========================
// Data transfer types
// ========================

#[derive(Debug, Serialize, Deserialize)]
pub struct DungeonResponse {
    pub seed: u64,
    pub report: GenerationReport,
    pub boss: Option<BossRoom>,
    pub nodes: Vec<(i32, i32)>,
    pub rooms: Vec<RoomInfo>,
    pub items: Vec<ItemInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoomInfo {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemInfo {
    pub x: i32,
    pub y: i32,
    /// `TileKind` as u8
    pub kind: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlacementResponse {
    pub seed: u64,
    pub stats: BuildStats,
    pub placements: Vec<RecordedPlacement>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub valid: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TileKindInfo {
    pub id: u8,
    pub name: String,
    pub glyph: char,
}

// ========================
// Helpers
// ========================

fn json_to_cstring<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => CString::new(json).unwrap_or_default().into_raw(),
        Err(_) => std::ptr::null_mut(),
    }
}

fn parse_cstr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_owned()) }
}

/// Null pointer selects the default config; anything unparsable is `None`.
fn dungeon_config_arg(ptr: *const c_char) -> Option<DungeonConfig> {
    if ptr.is_null() {
        return Some(DungeonConfig::default());
    }
    let json = parse_cstr(ptr)?;
    match DungeonConfig::from_json_str(&json) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected dungeon config");
            None
        }
    }
}

fn build_config_arg(ptr: *const c_char) -> Option<BuildConfig> {
    if ptr.is_null() {
        return Some(BuildConfig::default());
    }
    let json = parse_cstr(ptr)?;
    match BuildConfig::from_json_str(&json) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(error = %e, "Rejected build config");
            None
        }
    }
}

// ========================
// C-ABI: Core
// ========================

#[no_mangle]
pub extern "C" fn dungeon_version() -> *mut c_char {
    CString::new(env!("CARGO_PKG_VERSION"))
        .unwrap_or_default()
        .into_raw()
}

/// Free a string allocated by this library. Null is ignored.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}

#[no_mangle]
pub extern "C" fn dungeon_default_config() -> *mut c_char {
    json_to_cstring(&DungeonConfig::default())
}

#[no_mangle]
pub extern "C" fn dungeon_default_build_config() -> *mut c_char {
    json_to_cstring(&BuildConfig::default())
}

/// Checks a dungeon config without generating anything.
#[no_mangle]
pub extern "C" fn dungeon_validate_config(config_json: *const c_char) -> *mut c_char {
    let response = match parse_cstr(config_json) {
        None => ValidationResponse {
            valid: false,
            error: Some("null or non-UTF-8 input".to_string()),
        },
        Some(json) => match DungeonConfig::from_json_str(&json) {
            Ok(_) => ValidationResponse {
                valid: true,
                error: None,
            },
            Err(e) => ValidationResponse {
                valid: false,
                error: Some(e.to_string()),
            },
        },
    };
    json_to_cstring(&response)
}

#[no_mangle]
pub extern "C" fn dungeon_tile_kinds() -> *mut c_char {
    let kinds: Vec<TileKindInfo> = TileKind::ALL
        .iter()
        .map(|k| TileKindInfo {
            id: k.as_u8(),
            name: k.name().to_string(),
            glyph: visualization::glyph(*k),
        })
        .collect();
    json_to_cstring(&kinds)
}

// ========================
// C-ABI: Generation
// ========================

/// Generates a dungeon and returns layout, report and compiled build queue.
/// `config_json` may be null for the defaults.
#[no_mangle]
pub extern "C" fn dungeon_generate(seed: u64, config_json: *const c_char) -> *mut c_char {
    let Some(config) = dungeon_config_arg(config_json) else {
        return std::ptr::null_mut();
    };
    let dungeon = generate_dungeon(&config, seed);
    let layout = &dungeon.layout;

    let response = DungeonResponse {
        seed,
        report: dungeon.report.clone(),
        boss: layout.boss,
        nodes: layout.nodes.iter().map(|n| (n.x, n.y)).collect(),
        rooms: layout
            .room_centers
            .iter()
            .filter_map(|c| {
                layout.room_size_at(*c).map(|s| RoomInfo {
                    x: c.x,
                    y: c.y,
                    width: s.width,
                    height: s.height,
                })
            })
            .collect(),
        items: dungeon
            .queue
            .iter()
            .map(|i| ItemInfo {
                x: i.pos.x,
                y: i.pos.y,
                kind: i.kind.as_u8(),
            })
            .collect(),
    };
    json_to_cstring(&response)
}

/// Generates and fully builds a dungeon headlessly, returning every
/// resolved placement with its prefab and world position.
#[no_mangle]
pub extern "C" fn dungeon_build_placements(
    seed: u64,
    config_json: *const c_char,
    build_json: *const c_char,
) -> *mut c_char {
    let (Some(config), Some(build)) = (
        dungeon_config_arg(config_json),
        build_config_arg(build_json),
    ) else {
        return std::ptr::null_mut();
    };
    let dungeon = generate_dungeon(&config, seed);
    let token = BuildToken::new();
    let mut builder =
        StagedBuilder::for_dungeon(&dungeon, build, PrefabCatalog::standard(), &token);
    let mut sink = RecordingSink::default();
    builder.drain(&mut sink);

    json_to_cstring(&PlacementResponse {
        seed,
        stats: builder.stats().clone(),
        placements: sink.placed,
    })
}

#[no_mangle]
pub extern "C" fn dungeon_render_ascii(seed: u64, config_json: *const c_char) -> *mut c_char {
    let Some(config) = dungeon_config_arg(config_json) else {
        return std::ptr::null_mut();
    };
    let dungeon = generate_dungeon(&config, seed);
    CString::new(visualization::render_ascii(&dungeon.queue))
        .unwrap_or_default()
        .into_raw()
}

// ========================
// C-ABI: Progression
// ========================

#[no_mangle]
pub extern "C" fn dungeon_floor_seed(seed: u64, floor_level: u32) -> u64 {
    DungeonSeed::new(seed).floor_hash(floor_level)
}

/// Floor plan for `floor_level`. A null schedule uses the single default stage.
#[no_mangle]
pub extern "C" fn dungeon_plan_floor(
    seed: u64,
    floor_level: u32,
    schedule_json: *const c_char,
) -> *mut c_char {
    let schedule = if schedule_json.is_null() {
        StageSchedule::default()
    } else {
        let Some(json) = parse_cstr(schedule_json) else {
            return std::ptr::null_mut();
        };
        match StageSchedule::from_json_str(&json) {
            Ok(schedule) => schedule,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected stage schedule");
                return std::ptr::null_mut();
            }
        }
    };
    match schedule.plan(&DungeonSeed::new(seed), floor_level) {
        Some(plan) => json_to_cstring(&plan),
        None => std::ptr::null_mut(),
    }
}

// ========================
// C-ABI: Survey
// ========================

#[no_mangle]
pub extern "C" fn dungeon_survey(
    base_seed: u64,
    dungeon_count: u32,
    config_json: *const c_char,
) -> *mut c_char {
    let Some(config) = dungeon_config_arg(config_json) else {
        return std::ptr::null_mut();
    };
    let report = run_survey(&SurveyConfig {
        base_seed,
        dungeon_count,
        config,
    });
    json_to_cstring(&report)
}

// ========================
// C-ABI: Logging
// ========================

#[no_mangle]
pub extern "C" fn logging_get_default_config() -> *mut c_char {
    json_to_cstring(&logging::TracingConfig::default())
}

/// Installs the subscriber. Null or bad JSON falls back to the defaults.
#[no_mangle]
pub extern "C" fn logging_init(config_json: *const c_char) {
    let config = parse_cstr(config_json)
        .and_then(|json| logging::TracingConfig::from_json(&json))
        .unwrap_or_default();
    logging::init_tracing(&config);
}

#[no_mangle]
pub extern "C" fn logging_get_snapshot() -> *mut c_char {
    json_to_cstring(&logging::LoggingSnapshot::capture())
}

/// Log a host message (0=Trace, 1=Debug, 2=Info, 3=Warn, 4=Error)
#[no_mangle]
pub extern "C" fn logging_log_message(level: u32, target: *const c_char, message: *const c_char) {
    let (Some(target), Some(message)) = (parse_cstr(target), parse_cstr(message)) else {
        return;
    };
    logging::log_host_message(logging::LogLevel::from_id(level), &target, &message);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take_json(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null(), "bridge returned null");
        let json = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_owned() };
        free_string(ptr);
        json
    }

    fn small_config() -> CString {
        let mut config = DungeonConfig::default();
        config.network.node_count = 8;
        CString::new(config.to_json()).unwrap()
    }

    #[test]
    fn test_version_ffi() {
        assert_eq!(take_json(dungeon_version()), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_free_null_is_noop() {
        free_string(std::ptr::null_mut());
    }

    #[test]
    fn test_default_config_roundtrips() {
        let json = take_json(dungeon_default_config());
        let config = DungeonConfig::from_json_str(&json).unwrap();
        assert_eq!(config, DungeonConfig::default());
    }

    #[test]
    fn test_generate_ffi() {
        let config = small_config();
        let json = take_json(dungeon_generate(99, config.as_ptr()));
        let response: DungeonResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response.seed, 99);
        assert_eq!(response.nodes[0], (0, 0), "origin is always the first node");
        assert!(response.boss.is_none());
        assert!(!response.items.is_empty());
        assert!(response.items.iter().all(|i| i.kind <= 6));
    }

    #[test]
    fn test_generate_null_config_uses_defaults() {
        let json = take_json(dungeon_generate(5, std::ptr::null()));
        let response: DungeonResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response.report.nodes.requested, 25);
    }

    #[test]
    fn test_generate_rejects_bad_config() {
        let bad = CString::new(r#"{"network":{"min_tunnel_width":9,"max_tunnel_width":2}}"#).unwrap();
        assert!(dungeon_generate(1, bad.as_ptr()).is_null());
        let garbage = CString::new("not json").unwrap();
        assert!(dungeon_generate(1, garbage.as_ptr()).is_null());
    }

    #[test]
    fn test_validate_config_ffi() {
        let good = small_config();
        let response: ValidationResponse =
            serde_json::from_str(&take_json(dungeon_validate_config(good.as_ptr()))).unwrap();
        assert!(response.valid);

        let response: ValidationResponse =
            serde_json::from_str(&take_json(dungeon_validate_config(std::ptr::null()))).unwrap();
        assert!(!response.valid);
        assert!(response.error.is_some());
    }

    #[test]
    fn test_build_placements_ffi() {
        let config = small_config();
        let json = take_json(dungeon_build_placements(4, config.as_ptr(), std::ptr::null()));
        let response: PlacementResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response.placements.len(), response.stats.total_placed());
        assert!(response.placements.iter().all(|p| !p.prefab.is_empty()));
    }

    #[test]
    fn test_render_ascii_ffi() {
        let config = small_config();
        let map = take_json(dungeon_render_ascii(4, config.as_ptr()));
        assert!(map.contains('.'));
        assert!(map.contains('#'));
    }

    #[test]
    fn test_floor_seed_matches_progression() {
        assert_eq!(dungeon_floor_seed(42, 3), DungeonSeed::new(42).floor_hash(3));
    }

    #[test]
    fn test_plan_floor_ffi() {
        let json = take_json(dungeon_plan_floor(42, 10, std::ptr::null()));
        let plan: crate::progression::FloorPlan = serde_json::from_str(&json).unwrap();
        assert!(plan.boss_floor);
        assert!(plan.config.boss_room.enabled);

        let empty = CString::new(r#"{"stages":[]}"#).unwrap();
        assert!(dungeon_plan_floor(42, 1, empty.as_ptr()).is_null());
    }

    #[test]
    fn test_tile_kinds_ffi() {
        let kinds: Vec<TileKindInfo> = serde_json::from_str(&take_json(dungeon_tile_kinds())).unwrap();
        assert_eq!(kinds.len(), 7);
        assert_eq!(kinds[6].name, "spawner");
    }

    #[test]
    fn test_survey_ffi() {
        let config = small_config();
        let json = take_json(dungeon_survey(1, 3, config.as_ptr()));
        assert!(json.contains("\"dungeon_count\":3"));
    }

    #[test]
    fn test_logging_ffi() {
        logging_init(std::ptr::null());
        let target = CString::new("host").unwrap();
        let message = CString::new("hello").unwrap();
        logging_log_message(2, target.as_ptr(), message.as_ptr());
        logging_log_message(2, std::ptr::null(), message.as_ptr());
        let snapshot: serde_json::Value =
            serde_json::from_str(&take_json(logging_get_snapshot())).unwrap();
        assert_eq!(snapshot["installed"], true);
        assert!(snapshot["filter"].as_str().unwrap().contains("dungeon_core::bridge=warn"));
        assert!(take_json(logging_get_default_config()).contains("\"generation\":\"info\""));
    }
}
