//! The visible slice of the map.
//!
//! Everything drawn on the map lives in "local" coordinates: bevy world units
//! measured in screen pixels from the viewport center, `y` up. Keeping the
//! camera at the origin and moving content instead avoids f32 precision loss
//! at high zoom, where the world is millions of pixels wide.

use bevy::math::DVec2;
use bevy::prelude::*;

use crate::constants::{
    DEFAULT_CENTER, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH, DEFAULT_ZOOM,
};
use crate::geo::{self, LatLng, LatLngBounds};

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Viewport {
    center: LatLng,
    zoom: u8,
    min_zoom: u8,
    max_zoom: u8,
    /// Size of the map surface in logical pixels
    size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(
            DEFAULT_CENTER,
            DEFAULT_ZOOM,
            (DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM),
            Vec2::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT),
        )
    }
}

impl Viewport {
    pub fn new(center: LatLng, zoom: u8, limits: (u8, u8), size: Vec2) -> Self {
        let (min_zoom, max_zoom) = limits;
        Self {
            center: center.normalized(),
            zoom: zoom.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            size,
        }
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn zoom_limits(&self) -> (u8, u8) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn set_center(&mut self, center: LatLng) {
        self.center = center.normalized();
    }

    pub fn set_size(&mut self, size: Vec2) {
        self.size = size;
    }

    /// Set the zoom level, clamped to the limits. Returns the new level if it changed.
    pub fn set_zoom(&mut self, zoom: i32) -> Option<u8> {
        let clamped = zoom.clamp(i32::from(self.min_zoom), i32::from(self.max_zoom)) as u8;
        if clamped == self.zoom {
            return None;
        }
        self.zoom = clamped;
        Some(clamped)
    }

    /// Step the zoom level by `steps`. Returns the new level if it changed.
    pub fn zoom_by(&mut self, steps: i32) -> Option<u8> {
        self.set_zoom(i32::from(self.zoom) + steps)
    }

    /// Move the map by a screen-space drag delta (x right, y down).
    ///
    /// Dragging the map right moves the center west, like grabbing paper.
    pub fn pan_pixels(&mut self, delta: Vec2) {
        let center_px = geo::project(self.center, self.zoom);
        let moved = center_px - delta.as_dvec2();
        self.center = geo::unproject(moved, self.zoom);
    }

    /// Current bounds. A viewport wider than the world spans all longitudes.
    pub fn bounds(&self) -> LatLngBounds {
        let center_px = geo::project(self.center, self.zoom);
        let half = (self.size / 2.0).as_dvec2();
        let mut south_west = geo::unproject(center_px + DVec2::new(-half.x, half.y), self.zoom);
        let mut north_east = geo::unproject(center_px + DVec2::new(half.x, -half.y), self.zoom);

        if f64::from(self.size.x) >= geo::world_size(self.zoom) {
            south_west.lng = -180.0;
            north_east.lng = 180.0;
        }

        LatLngBounds::new(south_west, north_east)
    }

    /// Local position of a geographic point
    pub fn to_local(&self, coord: LatLng) -> Vec2 {
        self.pixel_to_local(geo::project(coord, self.zoom))
    }

    /// Local position of a world pixel at the current zoom.
    ///
    /// Points are shifted by whole world widths so they land in the copy of
    /// the world nearest the center.
    pub fn pixel_to_local(&self, pixel: DVec2) -> Vec2 {
        let world = geo::world_size(self.zoom);
        let center_px = geo::project(self.center, self.zoom);
        let mut dx = pixel.x - center_px.x;
        dx -= (dx / world).round() * world;
        let dy = pixel.y - center_px.y;
        Vec2::new(dx as f32, -dy as f32)
    }

    /// Local position of a world pixel without wrapping.
    ///
    /// Tile columns outside `0..2^zoom` stay in their own copy of the world,
    /// so neighbouring copies sit side by side when the view is wider than
    /// the world.
    pub fn pixel_offset(&self, pixel: DVec2) -> Vec2 {
        let center_px = geo::project(self.center, self.zoom);
        let delta = pixel - center_px;
        Vec2::new(delta.x as f32, -delta.y as f32)
    }

    /// Geographic point under a local position
    pub fn from_local(&self, local: Vec2) -> LatLng {
        let center_px = geo::project(self.center, self.zoom);
        let pixel = center_px + DVec2::new(f64::from(local.x), -f64::from(local.y));
        geo::unproject(pixel, self.zoom)
    }
}
