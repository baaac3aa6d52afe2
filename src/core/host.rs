//! Host seams of the driver: page geometry and scroll-input blocking.
//!
//! A browser host backs [`Viewport`] with `window.scrollY`, `innerHeight` and the
//! sticky container's rect, and [`InputLock`] with wheel/touch/key listeners.
//! [`SimulatedViewport`] and [`RecordingInputLock`] serve headless runs and tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;

/// Geometry of the page and of the sequence's scroll container, in CSS pixels.
pub trait Viewport {
    /// Current vertical scroll offset of the page.
    fn scroll_y(&self) -> f64;

    fn viewport_height(&self) -> f64;

    /// Absolute top of the container (relative to the document, not the viewport).
    fn container_top(&self) -> f64;

    /// Full height of the container (e.g. 5 viewport heights).
    fn container_height(&self) -> f64;

    /// Height over which scrolling maps to progress 0..1.
    fn scrollable_height(&self) -> f64 {
        self.container_height() - self.viewport_height()
    }
}

/// Blocks user scroll input (wheel, touch, keys) while held.
pub trait InputLock: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// RAII hold on an [`InputLock`]; releasing happens on drop, on every exit path.
pub struct ScrollLockGuard {
    lock: Arc<dyn InputLock>,
}

impl ScrollLockGuard {
    pub fn acquire(lock: Arc<dyn InputLock>) -> Self {
        lock.acquire();
        debug!("Scroll input blocked");
        Self { lock }
    }
}

impl Drop for ScrollLockGuard {
    fn drop(&mut self) {
        self.lock.release();
        debug!("Scroll input released");
    }
}

impl std::fmt::Debug for ScrollLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ScrollLockGuard")
    }
}

/// Lock that only counts, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct RecordingInputLock {
    held: AtomicUsize,
    acquisitions: AtomicUsize,
}

impl RecordingInputLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding acquisitions.
    pub fn held(&self) -> usize {
        self.held.load(Ordering::SeqCst)
    }

    pub fn is_held(&self) -> bool {
        self.held() > 0
    }

    /// Total acquisitions over the lock's life.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

impl InputLock for RecordingInputLock {
    fn acquire(&self) {
        self.held.fetch_add(1, Ordering::SeqCst);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        let _ = self
            .held
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }
}

/// Page geometry held in plain fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedViewport {
    pub scroll_y: f64,
    pub viewport_height: f64,
    pub container_top: f64,
    pub container_height: f64,
}

impl SimulatedViewport {
    /// Container of `multiple` viewport heights starting at `container_top`.
    pub fn new(viewport_height: f64, container_top: f64, multiple: f64) -> Self {
        Self {
            scroll_y: 0.0,
            viewport_height,
            container_top,
            container_height: viewport_height * multiple,
        }
    }

    /// Scroll so that the container is at `progress` of its scrollable range.
    pub fn scroll_to_progress(&mut self, progress: f64) {
        self.scroll_y = self.container_top + progress * self.scrollable_height().max(0.0);
    }
}

impl Viewport for SimulatedViewport {
    fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn container_top(&self) -> f64 {
        self.container_top
    }

    fn container_height(&self) -> f64 {
        self.container_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = Arc::new(RecordingInputLock::new());
        {
            let _guard = ScrollLockGuard::acquire(lock.clone());
            assert!(lock.is_held());
        }
        assert!(!lock.is_held());
        assert_eq!(lock.acquisitions(), 1);
    }

    #[test]
    fn test_release_never_underflows() {
        let lock = RecordingInputLock::new();
        lock.release();
        assert_eq!(lock.held(), 0);
    }

    #[test]
    fn test_simulated_viewport_scroll_to_progress() {
        let mut vp = SimulatedViewport::new(800.0, 1000.0, 5.0);
        assert_eq!(vp.scrollable_height(), 3200.0);
        vp.scroll_to_progress(0.25);
        assert_eq!(vp.scroll_y, 1800.0);
    }
}
