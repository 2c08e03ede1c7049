//! Geographic primitives and Web Mercator projection.
//!
//! Pixel coordinates follow the slippy-map convention: the world at zoom `z`
//! is `256 * 2^z` pixels square, `x` grows eastwards from the antimeridian and
//! `y` grows southwards from the northern projection limit.

use std::f64::consts::PI;
use std::fmt;

use bevy::math::DVec2;
use serde::{Deserialize, Serialize};

/// Edge length of one map tile in pixels
pub const TILE_SIZE: f64 = 256.0;

/// Latitude at which Web Mercator turns the world into a square
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A point on the globe in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Clamp latitude into the projectable range and wrap longitude into [-180, 180).
    pub fn normalized(self) -> Self {
        Self {
            lat: self.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            lng: wrap_longitude(self.lng),
        }
    }

    /// `lat,lng` as the backend expects it in query strings
    pub fn to_query_param(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl From<[f64; 2]> for LatLng {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(value: LatLng) -> Self {
        [value.lat, value.lng]
    }
}

/// Rectangle on the globe described by its south-west and north-east corners.
///
/// When `south_west.lng > north_east.lng` the box straddles the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.south_west.lng > self.north_east.lng
    }

    pub fn contains(&self, point: LatLng) -> bool {
        let lat_ok = self.south_west.lat <= point.lat && point.lat <= self.north_east.lat;
        let lng_ok = if self.crosses_antimeridian() {
            self.south_west.lng <= point.lng || point.lng <= self.north_east.lng
        } else {
            self.south_west.lng <= point.lng && point.lng <= self.north_east.lng
        };
        lat_ok && lng_ok
    }
}

/// Wrap a longitude into [-180, 180)
pub fn wrap_longitude(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

/// Width (and height) of the whole world in pixels at `zoom`
pub fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom)
}

/// Project a coordinate to world pixels at `zoom` (y grows southwards).
pub fn project(coord: LatLng, zoom: u8) -> DVec2 {
    let size = world_size(zoom);
    let lat = coord.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (coord.lng + 180.0) / 360.0 * size;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;
    DVec2::new(x, y)
}

/// Inverse of [`project`]. Longitude is wrapped, latitude clamped to the map edge.
pub fn unproject(pixel: DVec2, zoom: u8) -> LatLng {
    let size = world_size(zoom);
    let y = pixel.y.clamp(0.0, size);
    let lng = pixel.x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let lat = n.sinh().atan().to_degrees();
    LatLng::new(lat, wrap_longitude(lng))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_project_origin_is_world_center() {
        let px = project(LatLng::new(0.0, 0.0), 0);
        assert!(approx(px.x, 128.0));
        assert!(approx(px.y, 128.0));
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let stanford = LatLng::new(37.4236, -122.1619);
        for zoom in [1, 10, 14] {
            let back = unproject(project(stanford, zoom), zoom);
            assert!(approx(back.lat, stanford.lat), "zoom {zoom}: {back:?}");
            assert!(approx(back.lng, stanford.lng), "zoom {zoom}: {back:?}");
        }
    }

    #[test]
    fn test_world_size_doubles_per_zoom() {
        assert_eq!(world_size(0), 256.0);
        assert_eq!(world_size(1), 512.0);
        assert_eq!(world_size(14), 256.0 * 16384.0);
    }

    #[test]
    fn test_unproject_clamps_past_poles() {
        let north = unproject(DVec2::new(0.0, -500.0), 1);
        assert!(approx(north.lat, MAX_LATITUDE));
    }

    #[test]
    fn test_wrap_longitude() {
        assert!(approx(wrap_longitude(190.0), -170.0));
        assert!(approx(wrap_longitude(-190.0), 170.0));
        assert!(approx(wrap_longitude(180.0), -180.0));
        assert!(approx(wrap_longitude(45.0), 45.0));
    }

    #[test]
    fn test_query_param_format() {
        assert_eq!(LatLng::new(37.44, -122.14).to_query_param(), "37.44,-122.14");
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = LatLngBounds::new(LatLng::new(37.0, -123.0), LatLng::new(38.0, -122.0));
        assert!(!bounds.crosses_antimeridian());
        assert!(bounds.contains(LatLng::new(37.44, -122.14)));
        assert!(!bounds.contains(LatLng::new(40.0, -122.14)));
    }

    #[test]
    fn test_bounds_across_antimeridian() {
        let bounds = LatLngBounds::new(LatLng::new(-20.0, 170.0), LatLng::new(-10.0, -170.0));
        assert!(bounds.crosses_antimeridian());
        assert!(bounds.contains(LatLng::new(-15.0, 179.0)));
        assert!(bounds.contains(LatLng::new(-15.0, -179.0)));
        assert!(!bounds.contains(LatLng::new(-15.0, 0.0)));
    }

    #[test]
    fn test_normalized_clamps_latitude() {
        let p = LatLng::new(89.0, 200.0).normalized();
        assert!(approx(p.lat, MAX_LATITUDE));
        assert!(approx(p.lng, -160.0));
    }
}
