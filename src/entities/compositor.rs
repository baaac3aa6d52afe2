//! Canvas compositor - paints one frame with cover-fit scaling.
//!
//! The canvas backing store is sized in device pixels (`logical * dpr`, dpr
//! capped), and its transform is set to `dpr` so that all drawing below is
//! expressed in logical (CSS) pixels.
//!
//! Backends:
//! - [`PixelCanvas`]: in-memory RGBA8 surface (headless rendering, snapshots, tests)
//! - any host surface implementing [`Canvas`]

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use log::{debug, trace};

use super::frame::{FrameAsset, FrameImage};

/// Default cap for the device pixel ratio.
pub const MAX_DPR: f64 = 2.0;

/// Destination rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Cover fit: scale by the larger ratio so the canvas is fully covered,
/// centre the result (overflow is cropped evenly on both sides).
///
/// Returns `None` for a degenerate image.
pub fn cover_rect(canvas_w: f64, canvas_h: f64, img_w: u32, img_h: u32) -> Option<DrawRect> {
    if img_w == 0 || img_h == 0 {
        return None;
    }
    let (iw, ih) = (img_w as f64, img_h as f64);
    let scale = (canvas_w / iw).max(canvas_h / ih);
    let width = iw * scale;
    let height = ih * scale;
    Some(DrawRect {
        x: (canvas_w - width) / 2.0,
        y: (canvas_h - height) / 2.0,
        width,
        height,
    })
}

/// Effective device pixel ratio: non-finite or non-positive reads as 1, capped at
/// `max`, which itself is held within `[1, MAX_DPR]`.
pub fn effective_dpr(dpr: f64, max: f64) -> f64 {
    let dpr = if dpr.is_finite() && dpr > 0.0 { dpr } else { 1.0 };
    let cap = if max.is_nan() { MAX_DPR } else { max.clamp(1.0, MAX_DPR) };
    dpr.min(cap)
}

/// 2D drawing surface owned by the compositor.
pub trait Canvas {
    /// Backing store size in device pixels.
    fn backing_size(&self) -> (u32, u32);

    fn set_backing_size(&mut self, width: u32, height: u32);

    /// Uniform logical → device scale applied to subsequent draws.
    fn set_transform(&mut self, scale: f64);

    /// Clear the whole backing store to transparent.
    fn clear(&mut self);

    /// Draw `image` stretched into `rect` (logical pixels).
    fn draw_image(&mut self, image: &FrameImage, rect: DrawRect);
}

/// Paints frames onto a canvas it owns exclusively.
#[derive(Debug)]
pub struct Compositor<C: Canvas> {
    canvas: C,
    logical: (f64, f64),
    dpr: f64,
    max_dpr: f64,
    draws: u64,
}

impl<C: Canvas> Compositor<C> {
    pub fn new(canvas: C, max_dpr: f64) -> Self {
        Self {
            canvas,
            logical: (0.0, 0.0),
            dpr: 1.0,
            max_dpr,
            draws: 0,
        }
    }

    /// Resize to a logical viewport size at the given device pixel ratio.
    pub fn resize(&mut self, width: f64, height: f64, device_pixel_ratio: f64) {
        let dpr = effective_dpr(device_pixel_ratio, self.max_dpr);
        let width = width.max(0.0);
        let height = height.max(0.0);
        let backing_w = (width * dpr).floor() as u32;
        let backing_h = (height * dpr).floor() as u32;

        self.canvas.set_backing_size(backing_w, backing_h);
        self.canvas.set_transform(dpr);
        self.logical = (width, height);
        self.dpr = dpr;
        debug!(
            "Canvas resized: {}x{} logical, {}x{} backing (dpr {})",
            width, height, backing_w, backing_h, dpr
        );
    }

    /// Paint a frame. No-op when the handle is absent, not decoded yet, or
    /// the canvas has no area. Returns true when something was painted.
    pub fn draw(&mut self, asset: Option<&FrameAsset>) -> bool {
        let Some(asset) = asset else {
            return false;
        };
        let Some(image) = asset.image() else {
            trace!("Frame {} not ready, skipping draw", asset.frame());
            return false;
        };
        let (w, h) = self.logical;
        if w <= 0.0 || h <= 0.0 {
            return false;
        }
        let Some(rect) = cover_rect(w, h, image.width(), image.height()) else {
            return false;
        };

        self.canvas.clear();
        self.canvas.draw_image(&image, rect);
        self.draws += 1;
        trace!("Drew frame {} at {:?}", asset.frame(), rect);
        true
    }

    /// Clear the canvas, e.g. when the product changes.
    pub fn clear(&mut self) {
        self.canvas.clear();
    }

    pub fn draw_count(&self) -> u64 {
        self.draws
    }

    pub fn dpr(&self) -> f64 {
        self.dpr
    }

    pub fn logical_size(&self) -> (f64, f64) {
        self.logical
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut C {
        &mut self.canvas
    }
}

/// In-memory RGBA8 canvas.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    backing: RgbaImage,
    scale: f64,
}

impl Default for PixelCanvas {
    fn default() -> Self {
        Self {
            backing: RgbaImage::new(0, 0),
            scale: 1.0,
        }
    }
}

impl PixelCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.backing
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Write the backing store as an image file (format from the extension).
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.backing.save(path)
    }
}

impl Canvas for PixelCanvas {
    fn backing_size(&self) -> (u32, u32) {
        self.backing.dimensions()
    }

    fn set_backing_size(&mut self, width: u32, height: u32) {
        if self.backing.dimensions() != (width, height) {
            self.backing = RgbaImage::new(width, height);
        }
    }

    fn set_transform(&mut self, scale: f64) {
        self.scale = scale;
    }

    fn clear(&mut self) {
        for px in self.backing.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_image(&mut self, image: &FrameImage, rect: DrawRect) {
        let s = self.scale;
        let (bw, bh) = self.backing.dimensions();
        let (iw, ih) = (image.width(), image.height());
        let (dx, dy) = (rect.x * s, rect.y * s);
        let (dw, dh) = (rect.width * s, rect.height * s);
        if !(dw > 0.0 && dh > 0.0) || iw == 0 || ih == 0 {
            return;
        }

        // Part of the destination that lands on the backing store, in device px
        let clip = |v: f64, max: u32| v.round().clamp(0.0, max as f64) as u32;
        let (x0, x1) = (clip(dx, bw), clip(dx + dw, bw));
        let (y0, y1) = (clip(dy, bh), clip(dy + dh, bh));
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        // Matching source region; only that part is resampled
        let src = |v: u32, d: f64, dsize: f64, len: u32| (v as f64 - d) * len as f64 / dsize;
        let sx0 = (src(x0, dx, dw, iw).floor().max(0.0) as u32).min(iw - 1);
        let sy0 = (src(y0, dy, dh, ih).floor().max(0.0) as u32).min(ih - 1);
        let sx1 = (src(x1, dx, dw, iw).ceil() as u32).clamp(sx0 + 1, iw);
        let sy1 = (src(y1, dy, dh, ih).ceil() as u32).clamp(sy0 + 1, ih);

        let (tw, th) = (x1 - x0, y1 - y0);
        let region = imageops::crop_imm(image.rgba(), sx0, sy0, sx1 - sx0, sy1 - sy0).to_image();
        if region.dimensions() == (tw, th) {
            imageops::overlay(&mut self.backing, &region, x0 as i64, y0 as i64);
        } else {
            let scaled = imageops::resize(&region, tw, th, FilterType::Triangle);
            imageops::overlay(&mut self.backing, &scaled, x0 as i64, y0 as i64);
        }
    }
}
