//! Trigger and sequencing tests for the sync controller.

#![cfg(test)]

use std::time::Duration;

use bevy::ecs::world::CommandQueue;
use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, TaskPool};

use crate::geo::LatLng;
use crate::info_panel::InfoPanel;
use crate::map::{MapDragEnded, Viewport, ZoomChanged};
use crate::markers::{MarkerRegistry, PlaceMarker};
use crate::search::{Place, SearchClient};
use crate::sync::{
    apply_places, on_drag_ended, on_place_selected, on_zoom_changed, plan_resync, start_resync,
    PlaceSelected, ResyncQuery, ResyncReason, ResyncRequest, ResyncTask, SyncController,
};
use crate::ui::SearchBox;

/// Reasons of every resync request seen during the update
#[derive(Resource, Default)]
struct Collected(Vec<ResyncReason>);

fn collect_requests(mut reader: MessageReader<ResyncRequest>, mut collected: ResMut<Collected>) {
    collected.0.extend(reader.read().map(|r| r.reason));
}

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

fn stanford_viewport() -> Viewport {
    Viewport::new(
        LatLng::new(37.4236, -122.1619),
        13,
        (1, 14),
        Vec2::new(1600.0, 900.0),
    )
}

/// App running the trigger systems and recording the requests they raise
fn trigger_app() -> App {
    let mut app = App::new();
    app.add_message::<MapDragEnded>()
        .add_message::<ZoomChanged>()
        .add_message::<PlaceSelected>()
        .add_message::<ResyncRequest>()
        .init_resource::<InfoPanel>()
        .init_resource::<Collected>()
        .insert_resource(stanford_viewport())
        .add_systems(
            Update,
            (
                on_drag_ended,
                on_zoom_changed,
                on_place_selected,
                collect_requests,
            )
                .chain(),
        );
    app
}

fn open_panel(app: &mut App) {
    let anchor = app.world_mut().spawn_empty().id();
    app.world_mut()
        .resource_mut::<InfoPanel>()
        .show(anchor, None);
}

fn collected(app: &App) -> &[ResyncReason] {
    &app.world().resource::<Collected>().0
}

// Trigger A
#[test]
fn test_drag_end_with_panel_closed_resyncs() {
    let mut app = trigger_app();
    app.world_mut().write_message(MapDragEnded);
    app.update();

    assert_eq!(collected(&app), &[ResyncReason::DragEnded]);
}

#[test]
fn test_drag_end_with_panel_open_keeps_markers() {
    let mut app = trigger_app();
    open_panel(&mut app);
    app.world_mut().write_message(MapDragEnded);
    app.update();

    assert!(collected(&app).is_empty());
}

// Trigger B
#[test]
fn test_zoom_change_resyncs_with_panel_open() {
    let mut app = trigger_app();
    open_panel(&mut app);
    app.world_mut().write_message(ZoomChanged { zoom: 10 });
    app.update();

    assert_eq!(collected(&app), &[ResyncReason::ZoomChanged(10)]);
}

// Trigger C
#[test]
fn test_place_selection_recenters_then_resyncs() {
    let mut app = trigger_app();
    app.world_mut().write_message(PlaceSelected {
        place: place("Palo Alto", "94301", 37.44, -122.14),
    });
    app.update();

    let center = app.world().resource::<Viewport>().center();
    assert!((center.lat - 37.44).abs() < 1e-9);
    assert!((center.lng - -122.14).abs() < 1e-9);
    assert_eq!(collected(&app), &[ResyncReason::PlaceSelected]);
}

#[test]
fn test_no_trigger_no_resync() {
    let mut app = trigger_app();
    app.update();
    assert!(collected(&app).is_empty());
}

// Sequencing
#[test]
fn test_tokens_increase_and_supersede() {
    let mut controller = SyncController::default();
    let first = controller.next_token();
    let second = controller.next_token();

    assert!(second > first);
    assert!(!controller.is_current(first));
    assert!(controller.is_current(second));
    assert_eq!(controller.latest(), second);
}

#[test]
fn test_requests_in_one_frame_collapse_into_one_fetch() {
    let mut controller = SyncController::default();
    let viewport = stanford_viewport();
    let reasons = [ResyncReason::DragEnded, ResyncReason::ZoomChanged(12)];

    let (token, query) = plan_resync(&reasons, &mut controller, &viewport, "coffee").unwrap();

    assert_eq!(token, 1);
    assert_eq!(controller.latest(), 1);
    assert_eq!(query.query, "coffee");
    assert!(query.bounds.contains(LatLng::new(37.4236, -122.1619)));
}

#[test]
fn test_drag_end_fetches_live_bounds_and_query() {
    AsyncComputeTaskPool::get_or_init(TaskPool::new);

    // Nothing listens on the discard port; the fetch fails in the background
    let client = SearchClient::new("http://127.0.0.1:9", Duration::from_millis(50)).unwrap();
    let mut search_box = SearchBox::default();
    search_box.text = "coffee".to_string();
    let mut viewport = stanford_viewport();
    viewport.pan_pixels(Vec2::new(-400.0, 0.0));
    let expected_bounds = viewport.bounds();

    let mut app = App::new();
    app.add_message::<MapDragEnded>()
        .add_message::<ResyncRequest>()
        .init_resource::<InfoPanel>()
        .init_resource::<SyncController>()
        .insert_resource(viewport)
        .insert_resource(search_box)
        .insert_resource(client)
        .add_systems(Update, (on_drag_ended, start_resync).chain());

    app.world_mut().write_message(MapDragEnded);
    app.update();

    let world = app.world_mut();
    let tasks: Vec<(u64, ResyncQuery)> = world
        .query::<&ResyncTask>()
        .iter(world)
        .map(|task| (task.token, task.query.clone()))
        .collect();

    assert_eq!(tasks.len(), 1);
    let (token, query) = &tasks[0];
    assert_eq!(*token, 1);
    assert_eq!(query.query, "coffee");
    assert_eq!(query.bounds, expected_bounds);
    assert!(world.resource::<SyncController>().is_current(1));
}

#[test]
fn test_no_requests_no_fetch() {
    let mut controller = SyncController::default();
    let viewport = stanford_viewport();

    assert!(plan_resync(&[], &mut controller, &viewport, "").is_none());
    assert_eq!(controller.latest(), 0);
}

#[test]
fn test_later_resync_makes_earlier_stale() {
    let mut controller = SyncController::default();
    let viewport = stanford_viewport();

    let (first, _) = plan_resync(&[ResyncReason::Startup], &mut controller, &viewport, "").unwrap();
    let (second, _) =
        plan_resync(&[ResyncReason::DragEnded], &mut controller, &viewport, "").unwrap();

    assert!(!controller.is_current(first));
    assert!(controller.is_current(second));
}

#[test]
fn test_snapshot_captures_viewport_bounds() {
    let viewport = stanford_viewport();
    let snapshot = ResyncQuery::snapshot(&viewport, "");
    assert_eq!(snapshot.bounds, viewport.bounds());
    assert!(snapshot.query.is_empty());
}

// Applying responses
fn apply(world: &mut World, registry: &mut MarkerRegistry, panel: &mut InfoPanel, places: Vec<Place>) {
    let viewport = stanford_viewport();
    let mut queue = CommandQueue::default();
    {
        let mut commands = Commands::new(&mut queue, world);
        apply_places(&mut commands, registry, panel, &viewport, places);
    }
    queue.apply(world);
}

fn marker_count(world: &mut World) -> usize {
    world.query::<&PlaceMarker>().iter(world).count()
}

#[test]
fn test_apply_replaces_markers() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let mut panel = InfoPanel::default();

    apply(
        &mut world,
        &mut registry,
        &mut panel,
        vec![
            place("Stanford", "94305", 37.4236, -122.1619),
            place("Palo Alto", "94301", 37.44, -122.14),
        ],
    );
    assert_eq!(registry.len(), 2);
    assert_eq!(marker_count(&mut world), 2);

    apply(
        &mut world,
        &mut registry,
        &mut panel,
        vec![place("Menlo Park", "94025", 37.45, -122.18)],
    );
    assert_eq!(registry.len(), 1);
    assert_eq!(marker_count(&mut world), 1);

    apply(&mut world, &mut registry, &mut panel, Vec::new());
    assert!(registry.is_empty());
    assert_eq!(marker_count(&mut world), 0);
}

#[test]
fn test_apply_closes_panel_of_removed_marker() {
    let mut world = World::new();
    let mut registry = MarkerRegistry::default();
    let mut panel = InfoPanel::default();

    apply(
        &mut world,
        &mut registry,
        &mut panel,
        vec![place("Stanford", "94305", 37.4236, -122.1619)],
    );
    let anchor = registry.iter().next().unwrap();
    panel.show(anchor, None);

    apply(
        &mut world,
        &mut registry,
        &mut panel,
        vec![place("Stanford", "94305", 37.4236, -122.1619)],
    );
    assert!(!panel.is_open());
}
