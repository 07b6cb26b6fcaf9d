//! Viewport bounds and zoom supplied by the map renderer

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LngLat;

/// Errors from map inputs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid zoom level: {0}")]
    InvalidZoom(f64),
}

/// Visible geographic box in degrees.
///
/// `west > east` means the box crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, MapError> {
        let bounds = Self {
            west,
            south,
            east,
            north,
        };
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(MapError::InvalidBounds(format!("non-finite edge in {bounds:?}")));
        }
        if south > north {
            return Err(MapError::InvalidBounds(format!(
                "south {south} is above north {north}"
            )));
        }
        Ok(bounds)
    }

    /// The whole world
    pub fn world() -> Self {
        Self {
            west: -180.0,
            south: -90.0,
            east: 180.0,
            north: 90.0,
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    pub fn contains(&self, position: LngLat) -> bool {
        let LngLat {
            longitude,
            latitude,
        } = position;
        if latitude < self.south || latitude > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            longitude >= self.west || longitude <= self.east
        } else {
            longitude >= self.west && longitude <= self.east
        }
    }
}

/// Current map view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: Bounds,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(bounds: Bounds, zoom: f64) -> Result<Self, MapError> {
        if !zoom.is_finite() || zoom < 0.0 {
            return Err(MapError::InvalidZoom(zoom));
        }
        Ok(Self { bounds, zoom })
    }

    /// Whole-world view at `zoom`
    pub fn world(zoom: f64) -> Result<Self, MapError> {
        Self::new(Bounds::world(), zoom)
    }
}
