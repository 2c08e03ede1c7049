use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::constants::{MARKER_RADIUS, MARKER_STEM};
use crate::info_panel::InfoPanel;
use crate::map::MapCursor;
use crate::theme;

use super::{head_offset, PlaceMarker};

/// Spacing between the concentric rings that fill a pin head
const FILL_STEP: f32 = 1.5;

/// Draw each marker as a pin: stem from the place up to a filled head
pub fn draw_markers(
    mut gizmos: Gizmos,
    panel: Res<InfoPanel>,
    markers: Query<(Entity, &Transform), With<PlaceMarker>>,
) {
    for (entity, transform) in markers.iter() {
        let tip = transform.translation.truncate();
        let head = tip + head_offset();
        let fill = if panel.anchor() == Some(entity) {
            theme::MARKER_ACTIVE
        } else {
            theme::MARKER_FILL
        };

        gizmos.line_2d(tip, tip + Vec2::new(0.0, MARKER_STEM), theme::MARKER_OUTLINE);

        let mut radius = MARKER_RADIUS - FILL_STEP;
        while radius > 0.0 {
            gizmos.circle_2d(Isometry2d::from_translation(head), radius, fill);
            radius -= FILL_STEP;
        }
        gizmos.circle_2d(
            Isometry2d::from_translation(head),
            MARKER_RADIUS,
            theme::MARKER_OUTLINE,
        );
    }
}

/// Draw marker labels with egui so text stays crisp at any zoom
pub fn marker_labels_ui(
    mut contexts: EguiContexts,
    cursor: MapCursor,
    markers: Query<(Entity, &Transform, &PlaceMarker)>,
) -> Result {
    let ctx = contexts.ctx_mut()?;

    for (entity, transform, marker) in markers.iter() {
        let head = transform.translation.truncate() + head_offset();
        let Some(screen_pos) = cursor.local_to_screen(head) else {
            continue;
        };

        egui::Area::new(egui::Id::new(("marker_label", entity)))
            .order(egui::Order::Background)
            .fixed_pos(egui::pos2(screen_pos.x + MARKER_RADIUS + 4.0, screen_pos.y))
            .pivot(egui::Align2::LEFT_CENTER)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(theme::LABEL_HALO)
                    .corner_radius(3.0)
                    .inner_margin(egui::Margin::symmetric(4, 1))
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(&marker.label)
                                .color(theme::LABEL_TEXT)
                                .size(12.0)
                                .strong(),
                        );
                    });
            });
    }

    Ok(())
}
