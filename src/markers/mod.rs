//! Marker registry: the pins currently on the map, one per place.

mod registry;
mod rendering;
#[cfg(test)]
mod tests;

pub use registry::{MarkerRegistry, PlaceMarker};

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

use crate::constants::MARKER_HIT_RADIUS;
use crate::map::{MapClicked, Viewport};

/// A marker was clicked
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerClicked {
    pub marker: Entity,
}

/// Local position of a pin head relative to the point it marks
pub fn head_offset() -> Vec2 {
    Vec2::new(
        0.0,
        crate::constants::MARKER_STEM + crate::constants::MARKER_RADIUS,
    )
}

/// Marker whose head is nearest `local`, within the hit radius
pub fn marker_at<'a>(
    local: Vec2,
    markers: impl IntoIterator<Item = (Entity, &'a Transform)>,
) -> Option<Entity> {
    markers
        .into_iter()
        .map(|(entity, transform)| {
            let head = transform.translation.truncate() + head_offset();
            (entity, head.distance(local))
        })
        .filter(|(_, distance)| *distance <= MARKER_HIT_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(entity, _)| entity)
}

/// Turn plain map clicks into marker clicks
fn detect_marker_clicks(
    mut clicks: MessageReader<MapClicked>,
    markers: Query<(Entity, &Transform), With<PlaceMarker>>,
    mut marker_clicked: MessageWriter<MarkerClicked>,
) {
    for click in clicks.read() {
        if let Some(marker) = marker_at(click.local, markers.iter()) {
            marker_clicked.write(MarkerClicked { marker });
        }
    }
}

/// Re-place markers after the viewport changed
fn position_markers(
    viewport: Res<Viewport>,
    mut markers: Query<(&PlaceMarker, &mut Transform)>,
) {
    for (marker, mut transform) in markers.iter_mut() {
        let local = viewport.to_local(marker.place.coordinates());
        transform.translation = local.extend(registry::MARKER_Z);
    }
}

pub struct MarkerPlugin;

impl Plugin for MarkerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MarkerRegistry>()
            .add_message::<MarkerClicked>()
            .add_systems(
                Update,
                (
                    position_markers.run_if(resource_changed::<Viewport>),
                    detect_marker_clicks.run_if(on_message::<MapClicked>),
                    rendering::draw_markers,
                )
                    .chain(),
            )
            .add_systems(EguiPrimaryContextPass, rendering::marker_labels_ui);
    }
}
