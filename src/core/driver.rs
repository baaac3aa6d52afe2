//! Scroll/autoplay driver: turns page events into at most one repaint per frame change.
//!
//! **Architecture**: the host feeds [`DriverEvent`]s (scroll, resize, animation
//! frame, visibility) into [`Driver::handle`] one at a time on its UI thread.
//! The driver is the only component that triggers a redraw; the image cache
//! reports through its event channel, which is drained at the top of every tick.
//!
//! # States
//!
//! - `Idle`: scroll-controlled, autoplay still armed
//! - `Autoplaying`: timeline-controlled, scroll input blocked
//! - `ScrollControlled`: after autoplay; stays here until the product changes
//!
//! `Idle → Autoplaying` when the container becomes more than
//! `visibility_threshold` visible for the first time for this product.
//! `Autoplaying → ScrollControlled` once the autoplay duration elapsed.
//!
//! # Redraw suppression
//!
//! Every tick computes a target frame, but the compositor is only invoked
//! when it differs from the current frame or the current frame is dirty
//! (resize, its asset just became ready, product switch).

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace};

use crate::config::AnimatorSettings;
use crate::core::host::{InputLock, ScrollLockGuard, Viewport};
use crate::core::image_cache::{ImageCache, LoadEvent};
use crate::core::workers::Workers;
use crate::entities::compositor::{Canvas, Compositor};
use crate::entities::loader::AssetLoader;
use crate::entities::product::ProductConfig;
use crate::entities::sequence::FrameSequence;

/// Which source drives playback progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Progress from the page scroll position
    Scroll,
    /// Progress fed through [`Driver::render_by_progress`] or the autoplay timeline
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Autoplaying { started_at: Instant },
    ScrollControlled,
}

/// Host events, processed one at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverEvent {
    Scroll,
    Resize { width: f64, height: f64, dpr: f64 },
    /// Animation-frame callback; also the fallback for dropped scroll events
    AnimationFrame,
    /// Intersection ratio of the sticky container
    Visibility { ratio: f64 },
}

/// Counters for verifying redraw suppression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub ticks: u64,
    /// Compositor invocations
    pub redraws: u64,
    /// Invocations that actually painted
    pub painted: u64,
    /// Ticks whose target frame was already current
    pub suppressed: u64,
}

/// Where frames come from: shared by every product session of a driver.
#[derive(Clone)]
pub struct FrameSource {
    pub loader: Arc<dyn AssetLoader>,
    pub workers: Arc<Workers>,
}

/// Scroll-driven animator of one product's frame sequence.
pub struct Driver<C: Canvas, V: Viewport> {
    product: ProductConfig,
    sequence: FrameSequence,
    settings: AnimatorSettings,
    source: FrameSource,
    cache: ImageCache,
    compositor: Compositor<C>,
    viewport: V,
    input_lock: Arc<dyn InputLock>,
    lock_guard: Option<ScrollLockGuard>,
    state: DriverState,
    mode: ControlMode,
    autoplay_armed: bool,
    autoplay_duration: Duration,
    external_progress: f64,
    current_frame: u32,
    dirty: bool,
    /// Whether `current_frame` actually reached the canvas
    current_painted: bool,
    load_percent: u8,
    loading: bool,
    active: bool,
    stats: DriverStats,
}

impl<C: Canvas, V: Viewport> Driver<C, V> {
    /// Start animating `product`: frames begin loading right away.
    pub fn new(
        product: &ProductConfig,
        canvas: C,
        viewport: V,
        input_lock: Arc<dyn InputLock>,
        source: FrameSource,
        settings: AnimatorSettings,
    ) -> Self {
        let sequence = product.sequence();
        let cache = start_loading(&sequence, &source, &settings);
        let compositor = Compositor::new(canvas, settings.max_dpr);

        info!("Driver started for {} ({} frames)", product.id, sequence.total_frames());

        Self {
            product: product.clone(),
            autoplay_duration: settings.autoplay_duration(sequence.total_frames()),
            current_frame: sequence.first_visible_frame(),
            sequence,
            settings,
            source,
            cache,
            compositor,
            viewport,
            input_lock,
            lock_guard: None,
            state: DriverState::Idle,
            mode: ControlMode::Scroll,
            autoplay_armed: true,
            external_progress: 0.0,
            dirty: true,
            current_painted: false,
            load_percent: 0,
            loading: true,
            active: true,
            stats: DriverStats::default(),
        }
    }

    // === Accessors ===

    pub fn product(&self) -> &ProductConfig {
        &self.product
    }

    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Last frame number handed to the compositor.
    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    pub fn autoplay_duration(&self) -> Duration {
        self.autoplay_duration
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Load progress of the active product, 0..=100.
    pub fn loading_percent(&self) -> u8 {
        self.load_percent
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn compositor(&self) -> &Compositor<C> {
        &self.compositor
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut V {
        &mut self.viewport
    }

    /// Block until the current product's loader finished or was cancelled.
    pub fn wait_until_loaded(&mut self) {
        self.cache.wait();
    }

    // === Event entry point ===

    /// Process one host event. Returns the frame number if something was painted.
    pub fn handle(&mut self, event: DriverEvent, now: Instant) -> Option<u32> {
        match event {
            DriverEvent::Scroll | DriverEvent::AnimationFrame => self.tick(now),
            DriverEvent::Resize { width, height, dpr } => {
                self.compositor.resize(width, height, dpr);
                self.dirty = true;
                self.tick(now)
            }
            DriverEvent::Visibility { ratio } => {
                self.on_visibility(ratio, now);
                self.tick(now)
            }
        }
    }

    /// Start autoplay if the container crossed the visibility threshold for
    /// the first time for this product. Returns true if autoplay started.
    pub fn on_visibility(&mut self, ratio: f64, now: Instant) -> bool {
        if !self.active || !self.autoplay_armed || self.state != DriverState::Idle {
            return false;
        }
        if ratio > self.settings.visibility_threshold {
            self.start_autoplay(now);
            true
        } else {
            false
        }
    }

    /// One render-loop step: recompute progress, repaint only on change.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        if !self.active {
            return None;
        }
        self.stats.ticks += 1;
        self.drain_load_events();

        let progress = match self.state {
            DriverState::Autoplaying { started_at } => Some(self.advance_autoplay(started_at, now)),
            _ => match self.mode {
                ControlMode::External => Some(self.external_progress),
                ControlMode::Scroll => self.scroll_progress(),
            },
        };

        // Degenerate geometry keeps the last frame
        let target = progress.map_or(self.current_frame, |p| self.sequence.frame_at(p));
        self.present(target)
    }

    // === External control API ===

    /// Select the progress source. Ignored while autoplaying: the timeline
    /// keeps control until it finishes and then hands back to `Scroll`.
    pub fn set_control_mode(&mut self, mode: ControlMode) {
        if let DriverState::Autoplaying { .. } = self.state {
            debug!("Control mode {:?} ignored during autoplay", mode);
            return;
        }
        if self.mode != mode {
            debug!("Control mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }

    /// Show the frame for an externally supplied progress (clamped to [0, 1]).
    pub fn render_by_progress(&mut self, progress: f64) -> Option<u32> {
        if !self.active {
            return None;
        }
        self.external_progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        let frame = self.sequence.frame_at(self.external_progress);
        self.present(frame)
    }

    // === Lifecycle ===

    /// Replace the active product: cancel its loads, stop autoplay, release
    /// input, and start over from the new product's first visible frame.
    pub fn switch_product(&mut self, product: &ProductConfig) {
        self.cache.cancel();
        self.lock_guard = None;

        self.sequence = product.sequence();
        self.product = product.clone();
        self.autoplay_duration = self.settings.autoplay_duration(self.sequence.total_frames());
        self.cache = start_loading(&self.sequence, &self.source, &self.settings);

        self.state = DriverState::Idle;
        self.mode = ControlMode::Scroll;
        self.autoplay_armed = true;
        self.external_progress = 0.0;
        self.current_frame = self.sequence.first_visible_frame();
        self.dirty = true;
        self.current_painted = false;
        self.load_percent = 0;
        self.loading = true;
        self.compositor.clear();

        info!("Switched to product {}", product.id);
    }

    /// Stop processing events, cancel loading and release input. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.cache.cancel();
        self.lock_guard = None;
        debug!("Driver for {} shut down", self.product.id);
    }

    // === Internals ===

    fn start_autoplay(&mut self, now: Instant) {
        self.autoplay_armed = false;
        self.lock_guard = Some(ScrollLockGuard::acquire(Arc::clone(&self.input_lock)));
        self.mode = ControlMode::External;
        self.state = DriverState::Autoplaying { started_at: now };
        info!(
            "Autoplay started for {} ({} ms)",
            self.product.id,
            self.autoplay_duration.as_millis()
        );
    }

    fn advance_autoplay(&mut self, started_at: Instant, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(started_at);
        let t = (elapsed.as_secs_f64() / self.autoplay_duration.as_secs_f64()).min(1.0);
        let progress = self.settings.easing.apply(t);
        self.external_progress = progress;

        if elapsed >= self.autoplay_duration {
            self.finish_autoplay();
        }
        progress
    }

    fn finish_autoplay(&mut self) {
        self.lock_guard = None;
        self.mode = ControlMode::Scroll;
        self.state = DriverState::ScrollControlled;
        info!("Autoplay finished for {}", self.product.id);
    }

    fn scroll_progress(&self) -> Option<f64> {
        let scrollable = self.viewport.scrollable_height();
        if !(scrollable > 0.0) {
            return None;
        }
        let current = self.viewport.scroll_y() - self.viewport.container_top();
        Some((current / scrollable).clamp(0.0, 1.0))
    }

    fn present(&mut self, frame: u32) -> Option<u32> {
        if frame == self.current_frame && !self.dirty {
            self.stats.suppressed += 1;
            return None;
        }

        self.current_frame = frame;
        self.dirty = false;
        self.stats.redraws += 1;

        self.current_painted = self.compositor.draw(self.cache.frame(frame).as_ref());
        if self.current_painted {
            self.stats.painted += 1;
            trace!("Painted frame {}", frame);
            Some(frame)
        } else {
            None
        }
    }

    fn drain_load_events(&mut self) {
        while let Some(event) = self.cache.try_next_event() {
            match event {
                LoadEvent::FrameSettled { frame, ok } => {
                    // The current frame was not drawable when last presented
                    if ok && frame == self.current_frame && !self.current_painted {
                        self.dirty = true;
                    }
                }
                LoadEvent::Progress { percent, .. } => self.load_percent = percent,
                LoadEvent::Complete => {
                    self.loading = false;
                    self.load_percent = 100;
                    debug!("Frames of {} fully loaded", self.product.id);
                }
            }
        }
    }
}

impl<C: Canvas, V: Viewport> Drop for Driver<C, V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn start_loading(
    sequence: &FrameSequence,
    source: &FrameSource,
    settings: &AnimatorSettings,
) -> ImageCache {
    ImageCache::load(
        sequence.clone(),
        Arc::clone(&source.loader),
        Arc::clone(&source.workers),
        settings.batch_size,
    )
}
