use bevy::prelude::*;

use crate::map::Viewport;
use crate::search::Place;

/// Markers draw above tiles
pub(crate) const MARKER_Z: f32 = 10.0;

/// A pin on the map for one place. The transform sits on the place itself
/// (the pin's tip).
#[derive(Component, Debug, Clone)]
pub struct PlaceMarker {
    pub place: Place,
    pub label: String,
}

/// Ordered list of the markers currently on the map.
///
/// The registry is the only owner of marker entities: every entity carrying
/// [`PlaceMarker`] was spawned by [`MarkerRegistry::add`] and is despawned by
/// [`MarkerRegistry::clear`].
#[derive(Resource, Default, Debug)]
pub struct MarkerRegistry {
    markers: Vec<Entity>,
}

impl MarkerRegistry {
    /// Spawn a labeled marker for `place` and start tracking it
    pub fn add(&mut self, commands: &mut Commands, place: Place, viewport: &Viewport) -> Entity {
        let local = viewport.to_local(place.coordinates());
        let label = place.marker_label();
        let entity = commands
            .spawn((
                PlaceMarker { place, label },
                Transform::from_translation(local.extend(MARKER_Z)),
            ))
            .id();
        self.markers.push(entity);
        entity
    }

    /// Despawn every tracked marker and forget it. Returns the removed handles.
    pub fn clear(&mut self, commands: &mut Commands) -> Vec<Entity> {
        let removed: Vec<Entity> = self.markers.drain(..).collect();
        for entity in &removed {
            if let Ok(mut entity_commands) = commands.get_entity(*entity) {
                entity_commands.despawn();
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.markers.contains(&entity)
    }

    /// Markers in the order they were added
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.markers.iter().copied()
    }
}
