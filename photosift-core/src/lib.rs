//! # PhotoSift Carousel Engine (photosift-core)
//!
//! Prefetching carousel over an ordered photo collection.
//!
//! **Purpose:** Show a small window of photographs at a time, keep the
//! neighbourhood of the cursor decoded ahead of navigation, and make every
//! deletion reversible.
//!
//! **Architecture:** One interactive caller owns the [`Carousel`] (sequence,
//! cursor, item store, undo history). A single background worker drains a
//! stable priority queue of load/score/evict/download jobs and reports results
//! back over a channel. Items come from a local folder or a paged remote
//! library.

pub mod carousel;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod item;
pub mod jobs;
pub mod quarantine;
pub mod remote;
pub mod scan;
pub mod session;
pub mod store;
pub mod undo;

pub use carousel::Carousel;
pub use config::EngineConfig;
pub use error::{Error, Result};
