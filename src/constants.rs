//! Centralized constants used across the application.
//!
//! This module contains magic numbers and configuration defaults that are used
//! in multiple places or would benefit from being named constants.

use crate::geo::LatLng;

/// Default window width in pixels (also the initial viewport width)
pub const DEFAULT_WINDOW_WIDTH: f32 = 1600.0;

/// Default window height in pixels (also the initial viewport height)
pub const DEFAULT_WINDOW_HEIGHT: f32 = 900.0;

/// Stanford, California
pub const DEFAULT_CENTER: LatLng = LatLng::new(37.4236, -122.1619);

/// Zoom level the map opens at
pub const DEFAULT_ZOOM: u8 = 13;

/// Furthest the map may zoom in
pub const DEFAULT_MAX_ZOOM: u8 = 14;

/// Furthest the map may zoom out
pub const DEFAULT_MIN_ZOOM: u8 = 1;

/// Backend serving `/search`, `/update` and `/articles`
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

/// Label-free basemap so only our own marker labels are drawn.
pub const DEFAULT_TILE_URL: &str =
    "https://{s}.basemaps.cartocdn.com/light_nolabels/{z}/{x}/{y}.png";

/// Per-request timeout for backend and tile calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Sent with every outgoing HTTP request
pub const USER_AGENT: &str = concat!("mashup/", env!("CARGO_PKG_VERSION"));

/// Maximum number of autocomplete suggestions shown under the search box
pub const MAX_SUGGESTIONS: usize = 10;

/// Maximum number of article links shown in the info panel
pub const MAX_ARTICLES: usize = 5;

/// Maximum number of tile downloads started per frame.
/// Higher values fill the map faster but burst more requests at the tile server.
pub const MAX_TILE_FETCHES_PER_FRAME: usize = 6;

/// Largest tile payload we are willing to read
pub const MAX_TILE_BYTES: u64 = 2 * 1024 * 1024;

/// Cursor travel (logical pixels) before a press counts as a drag instead of a click
pub const DRAG_THRESHOLD: f32 = 4.0;

/// Pixels the map moves per pan-control button press
pub const PAN_STEP: f32 = 160.0;

/// Scroll distance (pixel units) that makes up one zoom step on touchpads
pub const PIXEL_SCROLL_PER_ZOOM_STEP: f32 = 60.0;

/// Radius of the marker pin head in pixels
pub const MARKER_RADIUS: f32 = 7.0;

/// Height of the marker pin stem in pixels
pub const MARKER_STEM: f32 = 12.0;

/// Distance from a marker head that still counts as clicking it
pub const MARKER_HIT_RADIUS: f32 = 14.0;
