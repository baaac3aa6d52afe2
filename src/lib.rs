//! FLAVORSEQ - Scroll-driven image sequence animator library
//!
//! Re-exports all modules for use by binary targets.

// Core engine (workers, image cache, driver)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod runner;

// Re-export commonly used types from core
pub use crate::core::driver::{ControlMode, Driver, DriverEvent, DriverState, FrameSource};
pub use crate::core::image_cache::ImageCache;
pub use crate::core::workers::Workers;

// Re-export entities
pub use crate::entities::{Catalog, FrameDirection, FrameSequence, ProductConfig};
