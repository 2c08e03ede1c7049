use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::constants::PAN_STEP;
use crate::map::{MapDragEnded, MapOptions, Viewport, ZoomChanged};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    North,
    South,
    East,
    West,
}

impl PanDirection {
    fn label(&self) -> &'static str {
        match self {
            PanDirection::North => "⬆",
            PanDirection::South => "⬇",
            PanDirection::East => "➡",
            PanDirection::West => "⬅",
        }
    }

    /// Equivalent drag in screen pixels (y down). Dragging the map down
    /// brings the north into view.
    pub fn drag_delta(&self) -> Vec2 {
        match self {
            PanDirection::North => Vec2::new(0.0, PAN_STEP),
            PanDirection::South => Vec2::new(0.0, -PAN_STEP),
            PanDirection::East => Vec2::new(-PAN_STEP, 0.0),
            PanDirection::West => Vec2::new(PAN_STEP, 0.0),
        }
    }
}

fn pan_button(ui: &mut egui::Ui, direction: PanDirection) -> bool {
    ui.add(egui::Button::new(direction.label()).min_size(egui::vec2(28.0, 28.0)))
        .clicked()
}

/// Zoom and pan buttons in the bottom-right corner.
///
/// A pan step counts as a finished drag; zoom buttons change the level the
/// same way the mouse wheel does.
pub fn map_controls_ui(
    mut contexts: EguiContexts,
    options: Res<MapOptions>,
    mut viewport: ResMut<Viewport>,
    mut drag_ended: MessageWriter<MapDragEnded>,
    mut zoom_changed: MessageWriter<ZoomChanged>,
) -> Result {
    if !options.pan_control && !options.zoom_control {
        return Ok(());
    }

    let mut pan: Option<PanDirection> = None;
    let mut zoom_steps = 0;
    let (min_zoom, max_zoom) = viewport.zoom_limits();
    let zoom = viewport.zoom();

    egui::Window::new("map_controls")
        .title_bar(false)
        .resizable(false)
        .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -12.0])
        .show(contexts.ctx_mut()?, |ui| {
            if options.pan_control {
                egui::Grid::new("pan_grid").spacing([2.0, 2.0]).show(ui, |ui| {
                    ui.label("");
                    if pan_button(ui, PanDirection::North) {
                        pan = Some(PanDirection::North);
                    }
                    ui.end_row();

                    if pan_button(ui, PanDirection::West) {
                        pan = Some(PanDirection::West);
                    }
                    ui.label("");
                    if pan_button(ui, PanDirection::East) {
                        pan = Some(PanDirection::East);
                    }
                    ui.end_row();

                    ui.label("");
                    if pan_button(ui, PanDirection::South) {
                        pan = Some(PanDirection::South);
                    }
                    ui.end_row();
                });
            }

            if options.pan_control && options.zoom_control {
                ui.separator();
            }

            if options.zoom_control {
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(zoom > min_zoom, egui::Button::new("−"))
                        .on_hover_text("Zoom out")
                        .clicked()
                    {
                        zoom_steps -= 1;
                    }
                    ui.label(format!("{}", zoom));
                    if ui
                        .add_enabled(zoom < max_zoom, egui::Button::new("+"))
                        .on_hover_text("Zoom in")
                        .clicked()
                    {
                        zoom_steps += 1;
                    }
                });
            }
        });

    if let Some(direction) = pan {
        viewport.pan_pixels(direction.drag_delta());
        debug!("Panned {:?} to {}", direction, viewport.center());
        drag_ended.write(MapDragEnded);
    }

    if zoom_steps != 0
        && let Some(zoom) = viewport.zoom_by(zoom_steps)
    {
        zoom_changed.write(ZoomChanged { zoom });
    }

    Ok(())
}
