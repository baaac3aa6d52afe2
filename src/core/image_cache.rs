//! Per-product frame table, populated in bounded batches.
//!
//! **Why**: a product page needs every frame of its sequence in memory for
//! smooth scrubbing, but issuing all loads at once floods the connection pool
//! and delays the frame the viewer sees first.
//!
//! # Loading
//!
//! - Frames load in `FrameSequence::load_order()` (first visible frame first)
//! - `batch_size` loads run concurrently on the shared [`Workers`]
//! - Batch N+1 starts only after every load of batch N settled
//! - A failed load is logged, its slot stays blank, and it still counts as settled
//!
//! # Events
//!
//! The coordinator thread reports through a channel the driver drains on its
//! own thread: [`LoadEvent::FrameSettled`] and [`LoadEvent::Progress`] after
//! each settlement, [`LoadEvent::Complete`] once when all frames settled.
//!
//! # Cancellation
//!
//! [`ImageCache::cancel`] bumps the session epoch. Queued jobs are skipped,
//! the coordinator stops at the next settlement boundary and never reports
//! `Complete`.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, info, trace, warn};

use crate::core::workers::{Epoch, Workers};
use crate::entities::frame::{FrameAsset, FrameStatus};
use crate::entities::loader::AssetLoader;
use crate::entities::resolver::resolve;
use crate::entities::sequence::FrameSequence;

/// Default number of loads in flight per batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Progress notifications of one load session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    /// A frame finished loading; `ok == false` means it stays blank.
    FrameSettled { frame: u32, ok: bool },
    Progress { loaded: usize, total: usize, percent: u8 },
    Complete,
}

/// `round(loaded / total * 100)`, 100 for an empty total.
pub fn load_percent(loaded: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((loaded as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Frame table of the active product.
pub struct ImageCache {
    sequence: FrameSequence,
    table: Arc<[FrameAsset]>,
    loaded: Arc<AtomicUsize>,
    epoch: Epoch,
    session: u64,
    events: Receiver<LoadEvent>,
    coordinator: Option<thread::JoinHandle<()>>,
}

impl ImageCache {
    /// Create the frame table and start loading it in the background.
    pub fn load(
        sequence: FrameSequence,
        loader: Arc<dyn AssetLoader>,
        workers: Arc<Workers>,
        batch_size: usize,
    ) -> Self {
        let table: Arc<[FrameAsset]> = (1..=sequence.total_frames())
            .map(|n| FrameAsset::new(n, resolve(sequence.base_path(), n)))
            .collect();
        let loaded = Arc::new(AtomicUsize::new(0));
        let epoch = Epoch::new();
        let session = epoch.current();
        let (tx, rx) = crossbeam_channel::unbounded();

        info!(
            "Loading {} frames of {} ({}, batch {})",
            sequence.total_frames(),
            sequence.base_path(),
            sequence.direction(),
            batch_size.max(1)
        );

        let ctx = LoadContext {
            batches: sequence.batches(batch_size),
            table: Arc::clone(&table),
            loaded: Arc::clone(&loaded),
            loader,
            workers,
            epoch: epoch.clone(),
            session,
            events: tx,
        };

        let coordinator = thread::Builder::new()
            .name("flavorseq-loader".to_string())
            .spawn(move || ctx.run())
            .map_err(|e| warn!("Failed to spawn loader thread: {}", e))
            .ok();

        Self {
            sequence,
            table,
            loaded,
            epoch,
            session,
            events: rx,
            coordinator,
        }
    }

    pub fn sequence(&self) -> &FrameSequence {
        &self.sequence
    }

    /// Handle of frame `frame` (1-indexed), ready or not.
    pub fn frame(&self, frame: u32) -> Option<FrameAsset> {
        self.sequence.slot(frame).map(|i| self.table[i].clone())
    }

    pub fn is_ready(&self, frame: u32) -> bool {
        self.sequence
            .slot(frame)
            .is_some_and(|i| self.table[i].is_complete())
    }

    pub fn status(&self, frame: u32) -> Option<FrameStatus> {
        self.sequence.slot(frame).map(|i| self.table[i].status())
    }

    /// Settled frames so far (failures included).
    pub fn loaded_count(&self) -> usize {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.table.len()
    }

    pub fn percent(&self) -> u8 {
        load_percent(self.loaded_count(), self.total())
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.loaded_count() == self.total()
    }

    /// Next pending event, if any. Never blocks.
    pub fn try_next_event(&self) -> Option<LoadEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Event stream, for hosts that want to block or select on it.
    pub fn events(&self) -> &Receiver<LoadEvent> {
        &self.events
    }

    pub fn is_cancelled(&self) -> bool {
        !self.epoch.is_current(self.session)
    }

    /// Stop loading. Queued jobs are skipped, no `Complete` is reported.
    pub fn cancel(&self) {
        if !self.is_cancelled() {
            self.epoch.bump();
            debug!(
                "Cancelled loading of {} at {}/{}",
                self.sequence.base_path(),
                self.loaded_count(),
                self.total()
            );
        }
    }

    /// Block until the coordinator thread exits (completion or cancellation).
    pub fn wait(&mut self) {
        if let Some(handle) = self.coordinator.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ImageCache {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Everything the coordinator thread needs.
struct LoadContext {
    batches: Vec<Vec<u32>>,
    table: Arc<[FrameAsset]>,
    loaded: Arc<AtomicUsize>,
    loader: Arc<dyn AssetLoader>,
    workers: Arc<Workers>,
    epoch: Epoch,
    session: u64,
    events: Sender<LoadEvent>,
}

impl LoadContext {
    fn run(self) {
        let total = self.table.len();

        for (batch_idx, batch) in self.batches.iter().enumerate() {
            if !self.epoch.is_current(self.session) {
                debug!("Load session {} cancelled before batch {}", self.session, batch_idx);
                return;
            }

            let (done_tx, done_rx) = crossbeam_channel::bounded(batch.len());
            for &frame in batch {
                let asset = self.table[(frame - 1) as usize].clone();
                let loader = Arc::clone(&self.loader);
                let done_tx = done_tx.clone();
                self.workers
                    .execute_with_epoch(&self.epoch, self.session, move || {
                        let ok = load_asset(&asset, loader.as_ref());
                        let _ = done_tx.send((frame, ok));
                    });
            }
            // Only the jobs hold senders now: skipped jobs disconnect the channel
            drop(done_tx);

            for _ in 0..batch.len() {
                let Ok((frame, ok)) = done_rx.recv() else {
                    debug!("Load session {} cancelled in batch {}", self.session, batch_idx);
                    return;
                };
                let loaded = self.loaded.fetch_add(1, Ordering::AcqRel) + 1;
                let _ = self.events.send(LoadEvent::FrameSettled { frame, ok });
                let _ = self.events.send(LoadEvent::Progress {
                    loaded,
                    total,
                    percent: load_percent(loaded, total),
                });
            }
            trace!("Batch {} settled ({} frames)", batch_idx, batch.len());
        }

        if self.epoch.is_current(self.session) {
            info!("All {} frames settled", total);
            let _ = self.events.send(LoadEvent::Complete);
        }
    }
}

/// Decode one frame into its slot. Returns false if the slot ended blank.
fn load_asset(asset: &FrameAsset, loader: &dyn AssetLoader) -> bool {
    if !asset.try_claim_for_loading() {
        return asset.is_complete();
    }
    match asset.settle(loader.load(asset.frame(), asset.url())) {
        Ok(()) => true,
        Err(e) => {
            warn!("Frame {} unavailable ({}): {}", asset.frame(), asset.url(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::frame::{FrameError, FrameImage};
    use crate::entities::sequence::FrameDirection;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records load order, fails for selected frames.
    #[derive(Default)]
    struct MockLoader {
        failing: HashSet<u32>,
        order: Mutex<Vec<u32>>,
        delay: Option<Duration>,
    }

    impl AssetLoader for MockLoader {
        fn load(&self, frame: u32, _url: &str) -> Result<FrameImage, FrameError> {
            self.order.lock().unwrap().push(frame);
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            if self.failing.contains(&frame) {
                Err(FrameError::NotFound(format!("{}", frame).into()))
            } else {
                Ok(FrameImage::solid(4, 4, [frame as u8, 0, 0, 255]))
            }
        }
    }

    fn drain_until_complete(cache: &ImageCache) -> Vec<LoadEvent> {
        let mut events = Vec::new();
        loop {
            let event = cache
                .events()
                .recv_timeout(Duration::from_secs(10))
                .expect("load did not complete");
            let done = event == LoadEvent::Complete;
            events.push(event);
            if done {
                return events;
            }
        }
    }

    #[test]
    fn test_load_percent() {
        assert_eq!(load_percent(0, 191), 0);
        assert_eq!(load_percent(1, 191), 1);
        assert_eq!(load_percent(95, 191), 50);
        assert_eq!(load_percent(191, 191), 100);
        assert_eq!(load_percent(0, 0), 100);
    }

    #[test]
    fn test_completion_with_failures() {
        let loader = Arc::new(MockLoader {
            failing: [3, 17, 25].into_iter().collect(),
            ..Default::default()
        });
        let workers = Arc::new(Workers::new(4));
        let seq = FrameSequence::new("/images/mango", 25, FrameDirection::Reverse);
        let mut cache = ImageCache::load(seq, loader, workers, DEFAULT_BATCH_SIZE);

        let events = drain_until_complete(&cache);
        cache.wait();

        // Progress is non-decreasing and ends at exactly 100
        let percents: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                LoadEvent::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents.len(), 25);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last(), Some(&100));

        let completes = events.iter().filter(|e| **e == LoadEvent::Complete).count();
        assert_eq!(completes, 1);
        assert!(cache.try_next_event().is_none());

        let failed: HashSet<u32> = events
            .iter()
            .filter_map(|e| match e {
                LoadEvent::FrameSettled { frame, ok: false } => Some(*frame),
                _ => None,
            })
            .collect();
        assert_eq!(failed, [3, 17, 25].into_iter().collect());

        assert!(cache.is_fully_loaded());
        assert_eq!(cache.percent(), 100);
        assert!(cache.is_ready(24));
        assert!(!cache.is_ready(25));
        assert_eq!(cache.status(3), Some(FrameStatus::Error));
        assert!(cache.frame(0).is_none());
        assert!(cache.frame(26).is_none());
    }

    #[test]
    fn test_batches_are_sequenced_in_display_order() {
        let loader = Arc::new(MockLoader::default());
        let workers = Arc::new(Workers::new(4));
        let seq = FrameSequence::new("/images/mango", 30, FrameDirection::Reverse);
        let mut cache = ImageCache::load(seq, loader.clone(), workers, 10);
        drain_until_complete(&cache);
        cache.wait();

        let order = loader.order.lock().unwrap().clone();
        assert_eq!(order.len(), 30);
        // Within a batch loads race, but batches never overlap
        let first: HashSet<u32> = order[..10].iter().copied().collect();
        let second: HashSet<u32> = order[10..20].iter().copied().collect();
        assert_eq!(first, (21..=30).collect());
        assert_eq!(second, (11..=20).collect());
    }

    #[test]
    fn test_single_frame_sequence() {
        let loader = Arc::new(MockLoader::default());
        let workers = Arc::new(Workers::new(1));
        let seq = FrameSequence::new("/images/still", 1, FrameDirection::Forward);
        let cache = ImageCache::load(seq, loader, workers, 10);
        let events = drain_until_complete(&cache);
        assert_eq!(
            events,
            vec![
                LoadEvent::FrameSettled { frame: 1, ok: true },
                LoadEvent::Progress { loaded: 1, total: 1, percent: 100 },
                LoadEvent::Complete,
            ]
        );
    }

    #[test]
    fn test_cancel_stops_without_complete() {
        let loader = Arc::new(MockLoader {
            delay: Some(Duration::from_millis(5)),
            ..Default::default()
        });
        let workers = Arc::new(Workers::new(2));
        let seq = FrameSequence::new("/images/chocolate", 191, FrameDirection::Forward);
        let mut cache = ImageCache::load(seq, loader.clone(), workers, 10);

        cache.cancel();
        assert!(cache.is_cancelled());
        cache.wait();

        let mut saw_complete = false;
        while let Some(event) = cache.try_next_event() {
            saw_complete |= event == LoadEvent::Complete;
        }
        assert!(!saw_complete);
        assert!(loader.order.lock().unwrap().len() <= 10);
        assert!(!cache.is_fully_loaded());
    }
}
