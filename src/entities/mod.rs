//! Entities module - domain types of a frame sequence
//!
//! Pure data and pure functions (sequence, resolver, mapper, easing) plus the
//! frame handle, the loader seam, the product catalog and the compositor.

pub mod compositor;
pub mod easing;
pub mod frame;
pub mod loader;
pub mod mapper;
pub mod product;
pub mod resolver;
pub mod sequence;

pub use compositor::{Canvas, Compositor, DrawRect, PixelCanvas};
pub use easing::Easing;
pub use frame::{FrameAsset, FrameError, FrameImage, FrameStatus};
pub use loader::{AssetLoader, FsLoader, PlaceholderLoader};
pub use mapper::map_frame;
pub use product::{Catalog, CatalogError, ProductConfig};
pub use resolver::resolve;
pub use sequence::{FrameDirection, FrameSequence};
