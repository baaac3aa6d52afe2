//! Frame assets: one decoded still image per frame number.
//!
//! **Why**: the image cache hands out frame handles before their pixels exist,
//! so the driver and compositor must be able to hold a handle that is not
//! ready yet and simply skip it.
//!
//! # Lifecycle
//!
//! `Pending` → `Loading` → `Loaded` | `Error`
//!
//! `try_claim_for_loading()` performs the Pending → Loading step atomically so
//! a frame is never decoded twice. Once `Loaded`, the image is immutable for
//! the rest of the handle's life. `Error` is terminal: the slot stays blank.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::RgbaImage;

/// Decoded RGBA8 pixels with fixed dimensions.
#[derive(Debug, Clone)]
pub struct FrameImage {
    pixels: RgbaImage,
}

impl FrameImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Solid-colour image, handy for placeholders and tests.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, image::Rgba(rgba)),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn rgba(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Frame loading status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Pending, // Load not issued yet
    Loading, // Claimed by a worker
    Loaded,  // Decoded, safe to draw
    Error,   // Failed, permanently blank
}

/// Frame loading errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    NotFound(PathBuf),
    Io(String),
    Decode(String),
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::NotFound(p) => write!(f, "Frame not found: {}", p.display()),
            FrameError::Io(e) => write!(f, "IO error: {}", e),
            FrameError::Decode(e) => write!(f, "Decode error: {}", e),
        }
    }
}

impl std::error::Error for FrameError {}

#[derive(Debug)]
struct AssetData {
    status: FrameStatus,
    image: Option<Arc<FrameImage>>,
}

/// Shared handle to one frame slot of the image cache.
///
/// Cloning is cheap; all clones observe the same status and image.
#[derive(Debug, Clone)]
pub struct FrameAsset {
    frame: u32,
    url: Arc<str>,
    data: Arc<Mutex<AssetData>>,
}

impl FrameAsset {
    pub fn new(frame: u32, url: impl Into<Arc<str>>) -> Self {
        Self {
            frame,
            url: url.into(),
            data: Arc::new(Mutex::new(AssetData {
                status: FrameStatus::Pending,
                image: None,
            })),
        }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> FrameStatus {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).status
    }

    /// True only when fully decoded and drawable.
    pub fn is_complete(&self) -> bool {
        self.status() == FrameStatus::Loaded
    }

    /// True once the load finished, successfully or not.
    pub fn is_settled(&self) -> bool {
        matches!(self.status(), FrameStatus::Loaded | FrameStatus::Error)
    }

    /// Decoded image, present only in `Loaded` state.
    pub fn image(&self) -> Option<Arc<FrameImage>> {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        match data.status {
            FrameStatus::Loaded => data.image.clone(),
            _ => None,
        }
    }

    /// Atomically claim the frame for loading (Pending → Loading).
    ///
    /// Returns `false` if another worker already claimed it or it settled.
    pub fn try_claim_for_loading(&self) -> bool {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if data.status == FrameStatus::Pending {
            data.status = FrameStatus::Loading;
            true
        } else {
            false
        }
    }

    /// Store the outcome of a load. Settled frames are never overwritten.
    pub fn settle(&self, result: Result<FrameImage, FrameError>) -> Result<(), FrameError> {
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(data.status, FrameStatus::Loaded | FrameStatus::Error) {
            return Ok(());
        }
        match result {
            Ok(image) => {
                data.image = Some(Arc::new(image));
                data.status = FrameStatus::Loaded;
                Ok(())
            }
            Err(e) => {
                data.image = None;
                data.status = FrameStatus::Error;
                Err(e)
            }
        }
    }
}
