//! Unit tests for the marker registry and hit testing.

#![cfg(test)]

use bevy::ecs::world::CommandQueue;
use bevy::prelude::*;

use crate::geo::LatLng;
use crate::map::Viewport;
use crate::markers::{head_offset, marker_at, MarkerRegistry, PlaceMarker};
use crate::search::Place;

fn place(name: &str, postal_code: &str, latitude: f64, longitude: f64) -> Place {
    Place {
        name: name.to_string(),
        postal_code: postal_code.to_string(),
        admin_region: "California".to_string(),
        admin_code: "CA".to_string(),
        country_code: "US".to_string(),
        latitude,
        longitude,
    }
}

fn viewport() -> Viewport {
    Viewport::new(
        LatLng::new(37.4236, -122.1619),
        13,
        (1, 14),
        Vec2::new(1600.0, 900.0),
    )
}

/// Run `f` against a command buffer, then apply it to the world
fn with_commands<R>(world: &mut World, f: impl FnOnce(&mut Commands) -> R) -> R {
    let mut queue = CommandQueue::default();
    let result = {
        let mut commands = Commands::new(&mut queue, world);
        f(&mut commands)
    };
    queue.apply(world);
    result
}

fn marker_count(world: &mut World) -> usize {
    world.query::<&PlaceMarker>().iter(world).count()
}

// Registry tests
#[test]
fn test_registry_default_is_empty() {
    let registry = MarkerRegistry::default();
    assert!(registry.is_empty());
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_add_spawns_labeled_marker() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let view = viewport();

    let entity = with_commands(&mut world, |commands| {
        registry.add(commands, place("Palo Alto", "94301", 37.44, -122.14), &view)
    });

    assert_eq!(registry.len(), 1);
    assert!(registry.contains(entity));
    assert_eq!(marker_count(&mut world), 1);

    let marker = world.get::<PlaceMarker>(entity).unwrap();
    assert_eq!(marker.label, "Palo Alto, CA");
    assert_eq!(marker.place.postal_code, "94301");
}

#[test]
fn test_add_places_marker_at_projected_position() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let view = viewport();

    let center = with_commands(&mut world, |commands| {
        registry.add(commands, place("Stanford", "94305", 37.4236, -122.1619), &view)
    });
    let east = with_commands(&mut world, |commands| {
        registry.add(commands, place("Menlo Park", "94025", 37.4236, -122.15), &view)
    });

    let center_pos = world.get::<Transform>(center).unwrap().translation;
    assert!(center_pos.truncate().length() < 0.01);

    let east_pos = world.get::<Transform>(east).unwrap().translation;
    assert!(east_pos.x > 0.0);
    assert!(east_pos.y.abs() < 0.01);
}

#[test]
fn test_clear_removes_every_marker() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let view = viewport();

    let added: Vec<Entity> = with_commands(&mut world, |commands| {
        (0..4)
            .map(|i| {
                let p = place(&format!("Place {}", i), "94301", 37.42 + i as f64 * 0.001, -122.16);
                registry.add(commands, p, &view)
            })
            .collect()
    });
    assert_eq!(marker_count(&mut world), 4);

    let removed = with_commands(&mut world, |commands| registry.clear(commands));

    assert_eq!(removed, added);
    assert!(registry.is_empty());
    assert_eq!(marker_count(&mut world), 0);
    assert!(added.iter().all(|e| world.get_entity(*e).is_err()));
}

#[test]
fn test_size_equals_adds_since_last_clear() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let view = viewport();

    with_commands(&mut world, |commands| {
        registry.add(commands, place("A", "1", 37.42, -122.16), &view);
        registry.add(commands, place("B", "2", 37.43, -122.16), &view);
    });
    with_commands(&mut world, |commands| {
        registry.clear(commands);
    });
    with_commands(&mut world, |commands| {
        registry.add(commands, place("C", "3", 37.44, -122.16), &view);
    });

    assert_eq!(registry.len(), 1);
    assert_eq!(marker_count(&mut world), 1);
}

#[test]
fn test_clear_empty_registry() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let removed = with_commands(&mut world, |commands| registry.clear(commands));
    assert!(removed.is_empty());
}

#[test]
fn test_clear_tolerates_already_despawned_marker() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let view = viewport();

    let entity = with_commands(&mut world, |commands| {
        registry.add(commands, place("Gone", "0", 37.42, -122.16), &view)
    });
    world.despawn(entity);

    let removed = with_commands(&mut world, |commands| registry.clear(commands));
    assert_eq!(removed, vec![entity]);
    assert!(registry.is_empty());
}

#[test]
fn test_iter_keeps_insertion_order() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let view = viewport();

    let added: Vec<Entity> = with_commands(&mut world, |commands| {
        ["A", "B", "C"]
            .iter()
            .map(|name| registry.add(commands, place(name, "0", 37.42, -122.16), &view))
            .collect()
    });

    assert_eq!(registry.iter().collect::<Vec<_>>(), added);
}

// Hit testing
#[test]
fn test_marker_at_hits_head() {
    let mut world = World::new();
    let a = world.spawn_empty().id();
    let transform = Transform::from_xyz(100.0, 50.0, 0.0);

    let head = Vec2::new(100.0, 50.0) + head_offset();
    assert_eq!(marker_at(head, [(a, &transform)]), Some(a));
    assert_eq!(marker_at(head + Vec2::new(5.0, -5.0), [(a, &transform)]), Some(a));
}

#[test]
fn test_marker_at_misses_far_clicks() {
    let mut world = World::new();
    let a = world.spawn_empty().id();
    let transform = Transform::from_xyz(100.0, 50.0, 0.0);

    assert_eq!(marker_at(Vec2::new(300.0, 50.0), [(a, &transform)]), None);
    assert_eq!(marker_at(Vec2::ZERO, std::iter::empty()), None);
}

#[test]
fn test_marker_at_prefers_nearest() {
    let mut world = World::new();
    let a = world.spawn_empty().id();
    let b = world.spawn_empty().id();
    let ta = Transform::from_xyz(0.0, 0.0, 0.0);
    let tb = Transform::from_xyz(8.0, 0.0, 0.0);

    let click = Vec2::new(7.0, 0.0) + head_offset();
    assert_eq!(marker_at(click, [(a, &ta), (b, &tb)]), Some(b));
}
