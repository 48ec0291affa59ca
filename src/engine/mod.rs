//! Bevy host adapter.
//!
//! Owns one [`DungeonSession`](crate::session::DungeonSession) as a resource
//! and drives its staged build from `Time::delta`, spawning a
//! [`DungeonTile`] entity per placed item.

pub mod plugin;
pub mod sink;

pub use plugin::{
    ActiveDungeon, DestroyDungeonEvent, DungeonPlugin, DungeonReadyEvent, GenerateDungeonEvent,
};
pub use sink::{DungeonTile, EntitySink, RoomSpawner};

// =====================================================
// Tests
// =====================================================
