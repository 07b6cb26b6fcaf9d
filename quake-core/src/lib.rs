//! QuakeScope Core - seismic event model and shared primitives
//!
//! This crate provides the foundational types every other crate builds on:
//! - Typed seismic events and immutable feed snapshots
//! - The classified error taxonomy for fetch/validation failures
//! - User-adjustable filter configuration and the recency/magnitude filter
//! - An injectable clock so time-dependent logic stays deterministic
//! - Summary statistics over a filtered event set

pub mod clock;
pub mod error;
pub mod event;
pub mod filter;
pub mod summary;

pub use clock::*;
pub use error::*;
pub use event::*;
pub use filter::*;
pub use summary::*;

/// Public USGS summary feed: all events from the past day
pub const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_day.geojson";

/// Default cache lifetime in milliseconds (upstream refreshes roughly every 5 minutes)
pub const DEFAULT_TTL_MS: i64 = 5 * 60 * 1000;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Fixed per-request deadline in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Backoff before retry `n` (0-based) is `min(BACKOFF_BASE_MS * 2^n, BACKOFF_CAP_MS)`
pub const BACKOFF_BASE_MS: u64 = 1000;

/// Upper bound for a single backoff wait
pub const BACKOFF_CAP_MS: u64 = 5000;

/// Default clustering radius in screen pixels
pub const DEFAULT_CLUSTER_RADIUS_PX: f64 = 60.0;

/// Zoom level at and above which points are never clustered
pub const DEFAULT_MAX_CLUSTER_ZOOM: f64 = 16.0;

/// Default magnitude filter bounds
pub const DEFAULT_MAGNITUDE_MIN: f64 = 0.0;
pub const DEFAULT_MAGNITUDE_MAX: f64 = 10.0;
