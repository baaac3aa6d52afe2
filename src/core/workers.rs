//! Shared thread pool for frame decoding.
//!
//! Uses work-stealing deques:
//! - External tasks go to a global injector
//! - Idle workers steal from each other
//!
//! Each load session owns an [`Epoch`]. Jobs submitted with
//! [`Workers::execute_with_epoch`] are skipped at execution time once that
//! epoch moved on, which is how a product switch cancels pending loads.

use crossbeam::deque::{Injector, Stealer, Worker};
use log::trace;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Cancellation counter shared between a load session and its jobs.
#[derive(Debug, Clone, Default)]
pub struct Epoch(Arc<AtomicU64>);

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advance the epoch, invalidating every job tagged with an older value.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }
}

/// Worker pool with work-stealing.
pub struct Workers {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl Workers {
    /// Spawn `num_threads` workers (at least one).
    ///
    /// Recommended: `num_cpus::get() * 3 / 4`, leaving room for the render loop.
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let locals: Vec<Worker<Job>> = (0..num_threads).map(|_| Worker::new_fifo()).collect();
        let stealers: Vec<Stealer<Job>> = locals.iter().map(|w| w.stealer()).collect();

        let handles = locals
            .into_iter()
            .enumerate()
            .map(|(worker_id, local)| {
                let injector = Arc::clone(&injector);
                let shutdown = Arc::clone(&shutdown);
                let stealers = stealers.clone();

                thread::Builder::new()
                    .name(format!("flavorseq-worker-{}", worker_id))
                    .spawn(move || run_worker(worker_id, local, &injector, &stealers, &shutdown))
                    .expect("Failed to spawn worker thread")
            })
            .collect();

        trace!("Workers initialized: {} threads (work-stealing)", num_threads);

        Self {
            injector,
            handles,
            shutdown,
        }
    }

    /// Pool sized from the machine, or `threads` when given.
    pub fn with_default_size(threads: Option<usize>) -> Self {
        Self::new(threads.unwrap_or_else(|| (num_cpus::get() * 3 / 4).max(1)))
    }

    pub fn num_threads(&self) -> usize {
        self.handles.len()
    }

    /// Execute closure on a worker thread.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.injector.push(Box::new(f));
    }

    /// Execute closure only if `epoch` still reads `expected` when a worker picks it up.
    ///
    /// A skipped closure is dropped without running, so anything it captured
    /// (channel senders included) is released.
    pub fn execute_with_epoch<F>(&self, epoch: &Epoch, expected: u64, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let epoch = epoch.clone();
        self.injector.push(Box::new(move || {
            if epoch.is_current(expected) {
                f();
            }
        }));
    }
}

fn run_worker(
    worker_id: usize,
    local: Worker<Job>,
    injector: &Injector<Job>,
    stealers: &[Stealer<Job>],
    shutdown: &AtomicBool,
) {
    trace!("Worker {} started", worker_id);

    loop {
        // Own queue, then global injector, then siblings
        let job = local.pop().or_else(|| {
            std::iter::repeat_with(|| {
                injector
                    .steal_batch_and_pop(&local)
                    .or_else(|| stealers.iter().map(|s| s.steal()).collect())
            })
            .find(|s| !s.is_retry())
            .and_then(|s| s.success())
        });

        if let Some(job) = job {
            job();
            continue;
        }

        if shutdown.load(Ordering::Relaxed) {
            break;
        }

        // No work - short sleep to avoid CPU spin
        thread::sleep(Duration::from_millis(1));
    }

    trace!("Worker {} stopped", worker_id);
}

impl Drop for Workers {
    fn drop(&mut self) {
        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);

        self.shutdown.store(true, Ordering::SeqCst);

        // Pending jobs of cancelled sessions are skipped quickly; the
        // deadline only guards against a decode that hangs.
        let deadline = Instant::now() + Duration::from_millis(500);

        for handle in std::mem::take(&mut self.handles) {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, exiting anyway");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }

        trace!("All {} workers stopped", num_threads);
    }
}
