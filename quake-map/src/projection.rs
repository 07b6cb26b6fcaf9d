//! Web Mercator projection to world pixel space
//!
//! At zoom `z` the world is a square of `tile_size * 2^z` pixels, with the
//! origin at the north-west corner.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Latitude limit of the square Mercator world
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.05112878;

/// Standard slippy-map tile edge in pixels
pub const TILE_SIZE: f64 = 256.0;

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub longitude: f64,
    pub latitude: f64,
}

impl LngLat {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// A position in world pixels at some zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn distance_squared(&self, other: &PixelPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Edge length of the world in pixels
pub fn world_size(zoom: f64, tile_size: f64) -> f64 {
    tile_size * zoom.exp2()
}

/// Longitude to normalized x in `[0, 1]`
pub fn lon_to_unit_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Latitude to normalized y in `[0, 1]`, north at 0
pub fn lat_to_unit_y(lat: f64) -> f64 {
    let lat_rad = lat
        .clamp(-MERCATOR_MAX_LAT_DEG, MERCATOR_MAX_LAT_DEG)
        .to_radians();
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0
}

pub fn unit_x_to_lon(x: f64) -> f64 {
    x * 360.0 - 180.0
}

pub fn unit_y_to_lat(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}

/// Project a coordinate to world pixels
pub fn project(position: LngLat, zoom: f64, tile_size: f64) -> PixelPoint {
    let size = world_size(zoom, tile_size);
    PixelPoint {
        x: lon_to_unit_x(position.longitude) * size,
        y: lat_to_unit_y(position.latitude) * size,
    }
}

/// Inverse of [`project`]
pub fn unproject(point: PixelPoint, zoom: f64, tile_size: f64) -> LngLat {
    let size = world_size(zoom, tile_size);
    LngLat {
        longitude: unit_x_to_lon(point.x / size),
        latitude: unit_y_to_lat(point.y / size),
    }
}
