//! Sync controller: keeps the markers in step with the viewport and query.
//!
//! Drag ends (while the info panel is closed), zoom changes, place selections
//! and startup all feed [`ResyncRequest`]. Requests raised in the same frame
//! collapse into one `/update` fetch. Every fetch carries a token; a response
//! whose token is older than the latest issued one is dropped.

#[cfg(test)]
mod tests;

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;

use crate::geo::LatLngBounds;
use crate::info_panel::InfoPanel;
use crate::map::{MapDragEnded, MapInitialized, Viewport, ZoomChanged};
use crate::markers::MarkerRegistry;
use crate::search::{self, Place, SearchClient};
use crate::ui::SearchBox;

/// Why a resync was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncReason {
    Startup,
    DragEnded,
    ZoomChanged(u8),
    PlaceSelected,
}

/// Ask for the markers to be refetched for the current view and query
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncRequest {
    pub reason: ResyncReason,
}

/// A place was picked from the autocomplete list
#[derive(Message, Debug, Clone, PartialEq)]
pub struct PlaceSelected {
    pub place: Place,
}

/// Issues tokens for resync fetches
#[derive(Resource, Default, Debug)]
pub struct SyncController {
    issued: u64,
}

impl SyncController {
    /// Token for a new fetch. Outstanding fetches become stale.
    pub fn next_token(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Whether `token` belongs to the most recent fetch
    pub fn is_current(&self, token: u64) -> bool {
        token == self.issued
    }

    pub fn latest(&self) -> u64 {
        self.issued
    }
}

/// Inputs of one resync, captured when it was issued
#[derive(Debug, Clone, PartialEq)]
pub struct ResyncQuery {
    pub bounds: LatLngBounds,
    pub query: String,
}

impl ResyncQuery {
    pub fn snapshot(viewport: &Viewport, query: &str) -> Self {
        Self {
            bounds: viewport.bounds(),
            query: query.to_string(),
        }
    }
}

/// In-flight `/update` fetch
#[derive(Component)]
pub struct ResyncTask {
    pub token: u64,
    pub query: ResyncQuery,
    task: Task<search::Result<Vec<Place>>>,
}

/// Trigger A: a finished drag resyncs unless the info panel is open
fn on_drag_ended(
    mut drags: MessageReader<MapDragEnded>,
    panel: Res<InfoPanel>,
    mut requests: MessageWriter<ResyncRequest>,
) {
    for _ in drags.read() {
        if panel.is_open() {
            debug!("Drag ended with info panel open, keeping markers");
            continue;
        }
        requests.write(ResyncRequest {
            reason: ResyncReason::DragEnded,
        });
    }
}

/// Trigger B: every zoom change resyncs
fn on_zoom_changed(
    mut zooms: MessageReader<ZoomChanged>,
    mut requests: MessageWriter<ResyncRequest>,
) {
    for change in zooms.read() {
        requests.write(ResyncRequest {
            reason: ResyncReason::ZoomChanged(change.zoom),
        });
    }
}

/// Trigger C: recenter on the selected place, then resync
fn on_place_selected(
    mut selections: MessageReader<PlaceSelected>,
    mut viewport: ResMut<Viewport>,
    mut requests: MessageWriter<ResyncRequest>,
) {
    for selection in selections.read() {
        let center = selection.place.coordinates();
        info!("Centering on {} at {}", selection.place.marker_label(), center);
        viewport.set_center(center);
        requests.write(ResyncRequest {
            reason: ResyncReason::PlaceSelected,
        });
    }
}

/// Trigger D: populate the map once it is configured
fn request_initial_resync(mut requests: MessageWriter<ResyncRequest>) {
    requests.write(ResyncRequest {
        reason: ResyncReason::Startup,
    });
}

/// Token and snapshot for one fetch covering every request in `reasons`
pub fn plan_resync(
    reasons: &[ResyncReason],
    controller: &mut SyncController,
    viewport: &Viewport,
    query: &str,
) -> Option<(u64, ResyncQuery)> {
    if reasons.is_empty() {
        return None;
    }
    Some((controller.next_token(), ResyncQuery::snapshot(viewport, query)))
}

/// Start one `/update` fetch for all requests raised this frame
fn start_resync(
    mut commands: Commands,
    mut requests: MessageReader<ResyncRequest>,
    mut controller: ResMut<SyncController>,
    viewport: Res<Viewport>,
    search_box: Res<SearchBox>,
    client: Res<SearchClient>,
) {
    let reasons: Vec<ResyncReason> = requests.read().map(|r| r.reason).collect();
    let Some((token, query)) =
        plan_resync(&reasons, &mut controller, &viewport, search_box.query())
    else {
        return;
    };
    debug!(
        "Resync #{} ({:?}): ne={} sw={} q={:?}",
        token, reasons, query.bounds.north_east, query.bounds.south_west, query.query
    );

    let client = client.clone();
    let bounds = query.bounds;
    let text = query.query.clone();
    let task = AsyncComputeTaskPool::get()
        .spawn(async move { client.places_in_bounds(&bounds, &text) });

    commands.spawn(ResyncTask { token, query, task });
}

/// Replace every marker with one per place.
///
/// Closes the info panel when its marker goes away. Returns the number of
/// markers added.
pub fn apply_places(
    commands: &mut Commands,
    registry: &mut MarkerRegistry,
    panel: &mut InfoPanel,
    viewport: &Viewport,
    places: Vec<Place>,
) -> usize {
    let removed = registry.clear(commands);
    if let Some(anchor) = panel.anchor()
        && removed.contains(&anchor)
    {
        panel.close();
    }

    let count = places.len();
    for place in places {
        registry.add(commands, place, viewport);
    }
    count
}

/// Apply finished fetches, dropping any that a newer resync superseded
fn poll_resync_tasks(
    mut commands: Commands,
    controller: Res<SyncController>,
    mut registry: ResMut<MarkerRegistry>,
    mut panel: ResMut<InfoPanel>,
    viewport: Res<Viewport>,
    mut tasks: Query<(Entity, &mut ResyncTask)>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut task.task)) else {
            continue;
        };
        commands.entity(entity).despawn();

        if !controller.is_current(task.token) {
            debug!(
                "Discarding stale resync #{} (latest #{})",
                task.token,
                controller.latest()
            );
            continue;
        }

        match result {
            Ok(places) => {
                let count =
                    apply_places(&mut commands, &mut registry, &mut panel, &viewport, places);
                info!(
                    "Resync #{} placed {} markers (q={:?})",
                    task.token, count, task.query.query
                );
            }
            Err(e) => {
                warn!("Resync #{} failed, keeping markers: {}", task.token, e);
            }
        }
    }
}

pub struct SyncPlugin;

impl Plugin for SyncPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SyncController>()
            .add_message::<ResyncRequest>()
            .add_message::<PlaceSelected>()
            .add_systems(Startup, request_initial_resync.after(MapInitialized))
            .add_systems(
                Update,
                (
                    on_drag_ended.run_if(on_message::<MapDragEnded>),
                    on_zoom_changed.run_if(on_message::<ZoomChanged>),
                    on_place_selected.run_if(on_message::<PlaceSelected>),
                    start_resync,
                    poll_resync_tasks,
                )
                    .chain(),
            );
    }
}
