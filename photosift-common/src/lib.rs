//! # PhotoSift Common Library
//!
//! Shared code for the PhotoSift crates:
//! - Error types
//! - Bootstrap configuration (TOML file, source folder resolution)
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
