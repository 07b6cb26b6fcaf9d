//! QuakeScope Map Pipeline
//!
//! Prepares filtered events for an external map renderer:
//! - Web Mercator projection and viewport handling
//! - Pixel-radius clustering that yields cluster and leaf render nodes
//! - Magnitude/depth colouring, point sizing and legends
//! - Recenter intents for cluster selection

pub mod cluster;
pub mod projection;
pub mod style;
pub mod viewport;

pub use cluster::*;
pub use projection::*;
pub use style::*;
pub use viewport::*;
