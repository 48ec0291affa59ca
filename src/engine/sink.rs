use bevy::prelude::*;

use crate::build_queue::TileKind;
use crate::builder::{Placement, PlacementSink};
use crate::generation::RoomSize;
use crate::grid::GridPos;

/// A placed dungeon tile
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct DungeonTile {
    pub grid: GridPos,
    pub kind: TileKind,
    pub prefab: String,
}

/// Enemy spawner state. `room_size` scales the spawn scatter.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSpawner {
    pub room_size: Option<RoomSize>,
    pub level: u32,
}

impl Default for RoomSpawner {
    fn default() -> Self {
        Self {
            room_size: None,
            level: 1,
        }
    }
}

/// Spawns tile entities through `Commands`.
pub struct EntitySink<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
}

impl<'a, 'w, 's> EntitySink<'a, 'w, 's> {
    pub fn new(commands: &'a mut Commands<'w, 's>) -> Self {
        Self { commands }
    }
}

impl PlacementSink for EntitySink<'_, '_, '_> {
    type Handle = Entity;

    fn place(&mut self, placement: &Placement<'_>) -> Option<Entity> {
        let world = placement.world;
        let mut entity = self.commands.spawn((
            DungeonTile {
                grid: placement.grid,
                kind: placement.kind,
                prefab: placement.prefab.to_string(),
            },
            Transform::from_xyz(world.x, world.y, world.z),
        ));
        if placement.kind == TileKind::Spawner {
            entity.insert(RoomSpawner::default());
        }
        Some(entity.id())
    }

    fn set_room_size(&mut self, handle: &Entity, size: RoomSize) {
        self.commands.entity(*handle).insert(RoomSpawner {
            room_size: Some(size),
            ..RoomSpawner::default()
        });
    }

    fn raise_spawner_level(&mut self, handle: &Entity) {
        let entity = *handle;
        self.commands.queue(move |world: &mut World| {
            if let Some(mut spawner) = world.get_mut::<RoomSpawner>(entity) {
                spawner.level += 1;
            }
        });
    }
}
