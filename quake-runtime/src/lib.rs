//! QuakeScope Runtime - feed state store
//!
//! Composes the feed engine and the clustering pipeline behind one store:
//! - Publishes loading/error/snapshot transitions as single atomic states
//! - Keeps the last good snapshot through failed refreshes
//! - Recomputes the filtered view whenever filters or data change
//! - Optionally refreshes on a fixed interval until shut down

pub mod store;

pub use store::*;
