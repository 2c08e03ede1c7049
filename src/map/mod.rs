//! Map host: owns the single map view, its viewport and display options.

mod camera;
pub mod tiles;
mod viewport;

pub use camera::MapCursor;
pub use viewport::Viewport;

use bevy::prelude::*;

use crate::config::{AppConfig, ConfigLoaded};
use crate::geo::LatLng;

/// Highest zoom level any tile source is expected to serve
pub const MAX_SUPPORTED_ZOOM: u8 = 19;

/// System set for map initialization (sync and UI start after this)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapInitialized;

/// Display options fixed at startup
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub center: LatLng,
    pub initial_zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Tile URL template; the default basemap hides labels and roads
    pub tile_url: String,
    pub pan_control: bool,
    pub zoom_control: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self::from_config(&crate::config::AppConfigData::default())
    }
}

impl MapOptions {
    pub fn from_config(data: &crate::config::AppConfigData) -> Self {
        let (min_zoom, max_zoom) = data.zoom_limits();
        Self {
            center: data.center(),
            initial_zoom: data.initial_zoom(),
            min_zoom,
            max_zoom,
            tile_url: data.tile_url.clone(),
            pan_control: true,
            zoom_control: true,
        }
    }
}

/// The user released the map after dragging it
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapDragEnded;

/// The zoom level changed
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomChanged {
    pub zoom: u8,
}

/// The user clicked the map without dragging it
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct MapClicked {
    /// Cursor position in local map coordinates
    pub local: Vec2,
}

/// Startup system applying config to the map options and viewport
fn initialize_map(
    config: Res<AppConfig>,
    mut options: ResMut<MapOptions>,
    mut viewport: ResMut<Viewport>,
) {
    *options = MapOptions::from_config(&config.data);
    *viewport = Viewport::new(
        options.center,
        options.initial_zoom,
        (options.min_zoom, options.max_zoom),
        viewport.size(),
    );
    info!(
        "Map initialized at {} zoom {} (limits {}-{})",
        options.center, options.initial_zoom, options.min_zoom, options.max_zoom
    );
}

pub struct MapHostPlugin;

impl Plugin for MapHostPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapOptions>()
            .init_resource::<Viewport>()
            .init_resource::<camera::MapDragState>()
            .init_resource::<camera::ScrollAccumulator>()
            .init_resource::<tiles::TileLayer>()
            .add_message::<MapDragEnded>()
            .add_message::<ZoomChanged>()
            .add_message::<MapClicked>()
            .add_systems(
                Startup,
                (initialize_map, camera::spawn_camera)
                    .chain()
                    .in_set(MapInitialized)
                    .after(ConfigLoaded),
            )
            .add_systems(
                Update,
                (
                    camera::sync_viewport_size,
                    camera::handle_map_drag,
                    camera::handle_scroll_zoom,
                    tiles::update_tiles,
                    tiles::poll_tile_tasks,
                    tiles::position_tiles.run_if(resource_changed::<Viewport>),
                )
                    .chain(),
            );
    }
}
