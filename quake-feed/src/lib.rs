//! QuakeScope Feed Layer
//!
//! Fetches the remote seismic feed and turns it into typed snapshots:
//! - HTTPS transport with a fixed request deadline
//! - Shape validation and tolerant per-record mapping
//! - Explicit snapshot cache with a time-to-live
//! - Retry with capped exponential backoff for transient failures

pub mod cache;
pub mod client;
pub mod engine;
pub mod parse;
pub mod transport;

pub use cache::*;
pub use client::*;
pub use engine::*;
pub use parse::*;
pub use transport::*;
