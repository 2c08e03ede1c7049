use bevy::ecs::system::SystemParam;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

use crate::constants::{DRAG_THRESHOLD, PIXEL_SCROLL_PER_ZOOM_STEP};

use super::{MapClicked, MapDragEnded, Viewport, ZoomChanged};

/// The single camera looking at the map. It never moves: content is laid out
/// relative to the viewport center instead.
#[derive(Component)]
pub struct MapCamera;

/// Bundled camera and window queries for cursor conversions
#[derive(SystemParam)]
pub struct MapCursor<'w, 's> {
    pub window: Query<'w, 's, &'static Window, With<PrimaryWindow>>,
    pub camera: Query<'w, 's, (&'static Camera, &'static GlobalTransform), With<MapCamera>>,
}

impl MapCursor<'_, '_> {
    /// Cursor position in window coordinates (origin top-left, y down)
    pub fn screen_pos(&self) -> Option<Vec2> {
        self.window.single().ok()?.cursor_position()
    }

    /// Cursor position in local map coordinates
    pub fn local_pos(&self) -> Option<Vec2> {
        let cursor_pos = self.screen_pos()?;
        let (camera, transform) = self.camera.single().ok()?;
        camera.viewport_to_world_2d(transform, cursor_pos).ok()
    }

    /// Window position of a local map coordinate
    pub fn local_to_screen(&self, local: Vec2) -> Option<Vec2> {
        let (camera, transform) = self.camera.single().ok()?;
        camera.world_to_viewport(transform, local.extend(0.0)).ok()
    }
}

/// Left-button drag tracking
#[derive(Resource, Default, Debug)]
pub struct MapDragState {
    /// A press started on the map (not on an egui area)
    pub active: bool,
    pub last_cursor: Option<Vec2>,
    /// Total cursor travel since the press, in logical pixels
    pub travelled: f32,
}

impl MapDragState {
    /// Whether the press has moved far enough to count as a drag
    pub fn is_drag(&self) -> bool {
        self.travelled >= DRAG_THRESHOLD
    }
}

/// Leftover touchpad scroll that has not yet added up to a zoom step
#[derive(Resource, Default, Debug)]
pub struct ScrollAccumulator {
    pub pixels: f32,
}

impl ScrollAccumulator {
    /// Whole zoom steps produced by one wheel event (positive zooms in)
    pub fn steps(&mut self, unit: MouseScrollUnit, y: f32) -> i32 {
        match unit {
            MouseScrollUnit::Line => {
                if y > 0.0 {
                    1
                } else if y < 0.0 {
                    -1
                } else {
                    0
                }
            }
            MouseScrollUnit::Pixel => {
                self.pixels += y;
                let steps = (self.pixels / PIXEL_SCROLL_PER_ZOOM_STEP).trunc();
                self.pixels -= steps * PIXEL_SCROLL_PER_ZOOM_STEP;
                steps as i32
            }
        }
    }
}

pub fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        MapCamera,
        Transform::from_translation(Vec3::new(0.0, 0.0, 1000.0)),
    ));
}

/// Keep the viewport size in step with the window
pub fn sync_viewport_size(
    window_query: Query<&Window, (With<PrimaryWindow>, Changed<Window>)>,
    mut viewport: ResMut<Viewport>,
) {
    let Ok(window) = window_query.single() else {
        return;
    };

    let size = Vec2::new(window.width(), window.height());
    if viewport.size() != size {
        viewport.set_size(size);
    }
}

/// Pan with the left mouse button; a release without travel is a click
pub fn handle_map_drag(
    mouse_button: Res<ButtonInput<MouseButton>>,
    cursor: MapCursor,
    mut contexts: EguiContexts,
    mut drag: ResMut<MapDragState>,
    mut viewport: ResMut<Viewport>,
    mut drag_ended: MessageWriter<MapDragEnded>,
    mut clicked: MessageWriter<MapClicked>,
) {
    let screen_pos = cursor.screen_pos();

    if mouse_button.just_pressed(MouseButton::Left) {
        // Presses that start on a panel belong to egui
        let over_ui = contexts
            .ctx_mut()
            .map(|ctx| ctx.is_pointer_over_area())
            .unwrap_or(false);

        *drag = MapDragState {
            active: !over_ui && screen_pos.is_some(),
            last_cursor: screen_pos,
            travelled: 0.0,
        };
    }

    if !drag.active {
        return;
    }

    if mouse_button.pressed(MouseButton::Left)
        && let (Some(now), Some(last)) = (screen_pos, drag.last_cursor)
    {
        let delta = now - last;
        if delta != Vec2::ZERO {
            viewport.pan_pixels(delta);
            drag.travelled += delta.length();
        }
        drag.last_cursor = Some(now);
    }

    if mouse_button.just_released(MouseButton::Left) {
        if drag.is_drag() {
            debug!("Map drag ended at {}", viewport.center());
            drag_ended.write(MapDragEnded);
        } else if let Some(local) = cursor.local_pos() {
            debug!("Map clicked at {}", viewport.from_local(local));
            clicked.write(MapClicked { local });
        }
        *drag = MapDragState::default();
    }
}

/// Zoom one level per wheel notch
pub fn handle_scroll_zoom(
    mut scroll_events: MessageReader<MouseWheel>,
    mut contexts: EguiContexts,
    mut accumulator: ResMut<ScrollAccumulator>,
    mut viewport: ResMut<Viewport>,
    mut zoom_changed: MessageWriter<ZoomChanged>,
) {
    let over_ui = contexts
        .ctx_mut()
        .map(|ctx| ctx.is_pointer_over_area())
        .unwrap_or(false);
    if over_ui {
        scroll_events.clear();
        return;
    }

    let steps: i32 = scroll_events
        .read()
        .map(|event| accumulator.steps(event.unit, event.y))
        .sum();

    if steps == 0 {
        return;
    }

    if let Some(zoom) = viewport.zoom_by(steps) {
        zoom_changed.write(ZoomChanged { zoom });
    }
}
