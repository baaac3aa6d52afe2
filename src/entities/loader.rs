//! Frame asset loaders.
//!
//! The image cache only knows the [`AssetLoader`] seam. Backends:
//! - [`FsLoader`]: reads `<root>/<decoded url path>` and decodes it with the `image` crate
//! - [`PlaceholderLoader`]: synthesises a frame, used when no asset directory is available

use std::path::{Path, PathBuf};

use image::{ImageReader, Rgba, RgbaImage};
use log::{debug, trace};

use super::frame::{FrameError, FrameImage};
use super::resolver::decode_path;

/// Loads one frame asset. Called from worker threads.
pub trait AssetLoader: Send + Sync {
    fn load(&self, frame: u32, url: &str) -> Result<FrameImage, FrameError>;
}

/// Filesystem-backed loader rooted at the directory the site serves assets from.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path a URL resolves to under this root.
    pub fn path_for(&self, url: &str) -> PathBuf {
        self.root.join(decode_path(url))
    }
}

impl AssetLoader for FsLoader {
    fn load(&self, frame: u32, url: &str) -> Result<FrameImage, FrameError> {
        let path = self.path_for(url);
        trace!("Loading frame {} from {}", frame, path.display());

        if !path.is_file() {
            return Err(FrameError::NotFound(path));
        }

        let img = ImageReader::open(&path)
            .map_err(|e| FrameError::Io(format!("{}: {}", path.display(), e)))?
            .with_guessed_format()
            .map_err(|e| FrameError::Io(format!("{}: {}", path.display(), e)))?
            .decode()
            .map_err(|e| FrameError::Decode(format!("{}: {}", path.display(), e)))?;

        debug!("Decoded frame {} ({}x{})", frame, img.width(), img.height());
        Ok(FrameImage::new(img.to_rgba8()))
    }
}

/// Synthetic frames: a bar whose length follows the frame number over a dark background.
#[derive(Debug, Clone)]
pub struct PlaceholderLoader {
    width: u32,
    height: u32,
    color: [u8; 4],
}

impl PlaceholderLoader {
    pub fn new(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            color,
        }
    }
}

impl Default for PlaceholderLoader {
    fn default() -> Self {
        // Dark green, same as an unloaded frame in the viewer
        Self::new(320, 180, [0, 100, 0, 255])
    }
}

impl AssetLoader for PlaceholderLoader {
    fn load(&self, frame: u32, _url: &str) -> Result<FrameImage, FrameError> {
        let bar = frame % (self.width + 1);
        let color = Rgba(self.color);
        let background = Rgba([16, 16, 16, 255]);
        let img = RgbaImage::from_fn(self.width, self.height, |x, _| {
            if x < bar { color } else { background }
        });
        Ok(FrameImage::new(img))
    }
}

/// Parse `#rrggbb` / `#rrggbbaa` colours from product configs.
pub fn parse_hex_color(hex: &str) -> Option<[u8; 4]> {
    let hex = hex.trim().trim_start_matches('#');
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::resolver::{frame_file_name, resolve};

    #[test]
    fn test_fs_loader_reads_gif_with_space_in_name() {
        let dir = tempfile::tempdir().unwrap();
        let seq_dir = dir.path().join("images").join("mango");
        std::fs::create_dir_all(&seq_dir).unwrap();

        let img = RgbaImage::from_pixel(6, 4, Rgba([250, 200, 10, 255]));
        img.save_with_format(seq_dir.join(frame_file_name(5)), image::ImageFormat::Gif)
            .unwrap();

        let loader = FsLoader::new(dir.path());
        let frame = loader.load(5, &resolve("/images/mango", 5)).unwrap();
        assert_eq!((frame.width(), frame.height()), (6, 4));
    }

    #[test]
    fn test_fs_loader_missing_frame() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsLoader::new(dir.path());
        let err = loader.load(9, &resolve("/images/mango", 9)).unwrap_err();
        assert!(matches!(err, FrameError::NotFound(_)));
    }

    #[test]
    fn test_fs_loader_corrupt_frame() {
        let dir = tempfile::tempdir().unwrap();
        let seq_dir = dir.path().join("images").join("mango");
        std::fs::create_dir_all(&seq_dir).unwrap();
        std::fs::write(seq_dir.join(frame_file_name(1)), b"not a gif").unwrap();

        let loader = FsLoader::new(dir.path());
        let err = loader.load(1, &resolve("/images/mango", 1)).unwrap_err();
        assert!(matches!(err, FrameError::Io(_) | FrameError::Decode(_)));
    }

    #[test]
    fn test_placeholder_frames_differ() {
        let loader = PlaceholderLoader::new(16, 2, [255, 0, 0, 255]);
        let a = loader.load(3, "").unwrap();
        let b = loader.load(9, "").unwrap();
        assert_eq!(a.rgba().get_pixel(5, 0), &Rgba([16, 16, 16, 255]));
        assert_eq!(b.rgba().get_pixel(5, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#facc15"), Some([0xfa, 0xcc, 0x15, 255]));
        assert_eq!(parse_hex_color("dc262680"), Some([0xdc, 0x26, 0x26, 0x80]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }
}
