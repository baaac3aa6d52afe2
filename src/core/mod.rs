//! Core engine modules - workers, image cache, preloading, driver
//!
//! These modules form the animation engine, independent of any host page.

pub mod driver;
pub mod host;
pub mod image_cache;
pub mod preload;
pub mod workers;

// Re-exports for convenience
pub use driver::{ControlMode, Driver, DriverEvent, DriverState, DriverStats, FrameSource};
pub use host::{InputLock, RecordingInputLock, ScrollLockGuard, SimulatedViewport, Viewport};
pub use image_cache::{ImageCache, LoadEvent};
pub use preload::{PreloadEvent, preload_catalog};
pub use workers::{Epoch, Workers};
