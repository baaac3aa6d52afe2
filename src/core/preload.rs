//! Catalog-wide preloading: warm every frame of every product up front.
//!
//! Unlike [`ImageCache`](crate::core::image_cache::ImageCache) this does not
//! keep the decoded frames; it only reports aggregate progress and which
//! assets are missing, e.g. for an intro screen or an asset check.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use log::{info, warn};

use crate::core::image_cache::load_percent;
use crate::core::workers::Workers;
use crate::entities::loader::AssetLoader;
use crate::entities::product::Catalog;
use crate::entities::resolver::resolve;

/// Aggregate preload notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadEvent {
    Progress { loaded: usize, total: usize, percent: u8 },
    Missing { product: String, frame: u32, url: String },
    Complete { missing: usize },
}

/// Issue one load per frame of every product; all loads run in parallel on `workers`.
///
/// `Complete` is reported exactly once, immediately for an empty catalog.
pub fn preload_catalog(
    catalog: &Catalog,
    loader: Arc<dyn AssetLoader>,
    workers: Arc<Workers>,
) -> Receiver<PreloadEvent> {
    let (tx, rx) = crossbeam_channel::unbounded();

    let jobs: Vec<(String, u32, String)> = catalog
        .iter()
        .flat_map(|p| {
            (1..=p.frame_count).map(move |n| (p.id.clone(), n, resolve(&p.image_path, n)))
        })
        .collect();
    let total = jobs.len();

    if total == 0 {
        let _ = tx.send(PreloadEvent::Complete { missing: 0 });
        return rx;
    }

    info!("Preloading {} frames of {} products", total, catalog.len());

    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    for (product, frame, url) in jobs {
        let loader = Arc::clone(&loader);
        let done_tx = done_tx.clone();
        workers.execute(move || {
            let ok = loader.load(frame, &url).is_ok();
            let _ = done_tx.send((product, frame, url, ok));
        });
    }
    drop(done_tx);

    let spawned = thread::Builder::new()
        .name("flavorseq-preload".to_string())
        .spawn(move || {
            let mut loaded = 0;
            let mut missing = 0;
            for (product, frame, url, ok) in done_rx.iter() {
                loaded += 1;
                if !ok {
                    missing += 1;
                    warn!("Missing frame: {}", url);
                    let _ = tx.send(PreloadEvent::Missing { product, frame, url });
                }
                let _ = tx.send(PreloadEvent::Progress {
                    loaded,
                    total,
                    percent: load_percent(loaded, total),
                });
            }
            if loaded == total {
                info!("Preload finished: {} frames, {} missing", total, missing);
                let _ = tx.send(PreloadEvent::Complete { missing });
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn preload thread: {}", e);
    }

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::frame::{FrameError, FrameImage};
    use crate::entities::product::ProductConfig;
    use std::time::Duration;

    struct EveryThirdMissing;

    impl AssetLoader for EveryThirdMissing {
        fn load(&self, frame: u32, url: &str) -> Result<FrameImage, FrameError> {
            if frame % 3 == 0 {
                Err(FrameError::NotFound(url.into()))
            } else {
                Ok(FrameImage::solid(1, 1, [0, 0, 0, 255]))
            }
        }
    }

    fn small_catalog() -> Catalog {
        let json = r#"[
            { "id": "a", "name": "A", "imagePath": "/images/a", "frameCount": 6 },
            { "id": "b", "name": "B", "imagePath": "/images/b", "frameCount": 4, "frameDirection": "reverse" }
        ]"#;
        Catalog::from_json(json).unwrap()
    }

    #[test]
    fn test_preload_reports_progress_and_missing() {
        let rx = preload_catalog(
            &small_catalog(),
            Arc::new(EveryThirdMissing),
            Arc::new(Workers::new(3)),
        );

        let mut events = Vec::new();
        loop {
            let event = rx.recv_timeout(Duration::from_secs(10)).unwrap();
            let done = matches!(event, PreloadEvent::Complete { .. });
            events.push(event);
            if done {
                break;
            }
        }

        assert_eq!(events.last(), Some(&PreloadEvent::Complete { missing: 3 }));
        let last_progress = events.iter().rev().find_map(|e| match e {
            PreloadEvent::Progress { loaded, total, percent } => Some((*loaded, *total, *percent)),
            _ => None,
        });
        assert_eq!(last_progress, Some((10, 10, 100)));

        let missing = events
            .iter()
            .filter(|e| matches!(e, PreloadEvent::Missing { .. }))
            .count();
        assert_eq!(missing, 3);
    }

    #[test]
    fn test_empty_catalog_completes_immediately() {
        let catalog = Catalog::new(Vec::<ProductConfig>::new()).unwrap();
        let rx = preload_catalog(&catalog, Arc::new(EveryThirdMissing), Arc::new(Workers::new(1)));
        assert_eq!(rx.try_recv(), Ok(PreloadEvent::Complete { missing: 0 }));
    }
}
