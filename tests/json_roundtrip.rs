/// Integration tests: JSON round-trip across the FFI boundary.
///
/// Simulates the engine-host pattern:
///   1. Fetch the default config JSON
///   2. Edit it client-side
///   3. Pass it back to generate / build / plan
///   4. Parse the responses and cross-check them
///   5. Free all strings
use std::ffi::{CStr, CString};

use dungeon_core::bridge::*;
use dungeon_core::config::DungeonConfig;

// ============================================================
// Helpers
// ============================================================

fn ptr_to_string(ptr: *mut std::os::raw::c_char) -> String {
    assert!(!ptr.is_null(), "FFI returned null pointer");
    let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_owned() };
    free_string(ptr);
    s
}

fn ptr_to_json(ptr: *mut std::os::raw::c_char) -> serde_json::Value {
    let s = ptr_to_string(ptr);
    serde_json::from_str(&s).unwrap_or_else(|e| {
        panic!("Invalid JSON from FFI: {e}\nRaw: {s}");
    })
}

fn edited_config(edit: impl FnOnce(&mut serde_json::Value)) -> CString {
    let mut config = ptr_to_json(dungeon_default_config());
    edit(&mut config);
    CString::new(config.to_string()).unwrap()
}

// ============================================================
// Config round-trips
// ============================================================

#[test]
fn default_config_survives_the_boundary() {
    let json = ptr_to_string(dungeon_default_config());
    let config: DungeonConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(config, DungeonConfig::default());
    let validated = ptr_to_json(dungeon_validate_config(CString::new(json).unwrap().as_ptr()));
    assert_eq!(validated["valid"], true);
}

#[test]
fn edited_config_drives_generation() {
    let config = edited_config(|c| {
        c["network"]["node_count"] = 6.into();
        c["boss_room"]["enabled"] = true.into();
    });
    let response = ptr_to_json(dungeon_generate(31, config.as_ptr()));
    assert_eq!(response["report"]["nodes"]["requested"], 6);
    assert!(response["boss"].is_object(), "boss room requested by the edit");
    assert!(response["report"]["boss_placement"]["kind"].is_string());
}

#[test]
fn default_build_config_round_trips() {
    let json = ptr_to_string(dungeon_default_build_config());
    let build = CString::new(json).unwrap();
    let config = edited_config(|c| c["network"]["node_count"] = 5.into());
    let response = ptr_to_json(dungeon_build_placements(2, config.as_ptr(), build.as_ptr()));
    assert!(response["placements"].as_array().is_some_and(|p| !p.is_empty()));
}

// ============================================================
// Cross-checks between responses
// ============================================================

#[test]
fn placements_match_generated_queue() {
    let config = edited_config(|c| c["network"]["node_count"] = 8.into());
    let generated = ptr_to_json(dungeon_generate(77, config.as_ptr()));
    let built = ptr_to_json(dungeon_build_placements(77, config.as_ptr(), std::ptr::null()));

    let items = generated["items"].as_array().unwrap();
    let placements = built["placements"].as_array().unwrap();
    let stacked = built["stats"]["stacked_spawners"].as_u64().unwrap() as usize;
    assert_eq!(items.len(), placements.len() + stacked);

    // first placement is the first queued floor cell, scaled by the default spacing
    let first_item = &items[0];
    let first = &placements[0];
    assert_eq!(first["grid"]["x"], first_item["x"]);
    assert_eq!(first["grid"]["y"], first_item["y"]);
    let x = first_item["x"].as_f64().unwrap() * 1.5;
    assert!((first["world"]["x"].as_f64().unwrap() - x).abs() < 1e-4);
}

#[test]
fn rooms_in_response_have_recorded_sizes() {
    let config = edited_config(|c| c["rooms"]["branch_chance"] = 100.into());
    let response = ptr_to_json(dungeon_generate(5, config.as_ptr()));
    let rooms = response["rooms"].as_array().unwrap();
    assert!(!rooms.is_empty(), "every node rolls at least one branch");
    for room in rooms {
        let width = room["width"].as_i64().unwrap();
        let height = room["height"].as_i64().unwrap();
        assert!((5..=10).contains(&width) && (5..=10).contains(&height));
    }
}

#[test]
fn generation_json_is_stable() {
    let config = edited_config(|c| c["network"]["node_count"] = 7.into());
    let a = ptr_to_string(dungeon_generate(123, config.as_ptr()));
    let b = ptr_to_string(dungeon_generate(123, config.as_ptr()));
    assert_eq!(a, b, "same seed and config must serialize identically");
}

// ============================================================
// Progression
// ============================================================

#[test]
fn planned_floor_feeds_generation() {
    let schedule = CString::new(
        r#"{"stages":[{"name":"caves","dungeon":{"network":{"node_count":5}}},{"name":"halls"}],"boss_interval":5}"#,
    )
    .unwrap();
    let plan = ptr_to_json(dungeon_plan_floor(9, 5, schedule.as_ptr()));
    assert_eq!(plan["stage_name"], "halls");
    assert_eq!(plan["boss_floor"], true);
    assert_eq!(plan["seed"].as_u64().unwrap(), dungeon_floor_seed(9, 5));

    let config = CString::new(plan["config"].to_string()).unwrap();
    let dungeon = ptr_to_json(dungeon_generate(plan["seed"].as_u64().unwrap(), config.as_ptr()));
    assert!(dungeon["boss"].is_object());

    let early = ptr_to_json(dungeon_plan_floor(9, 2, schedule.as_ptr()));
    assert_eq!(early["stage_name"], "caves");
    assert_eq!(early["config"]["network"]["node_count"], 5);
    assert_eq!(early["boss_floor"], false);
}
