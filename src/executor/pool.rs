//! Fixed-size queued thread pool.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use super::error::{SubmitError, SubmitResult};
use crate::reserved::panic_message;
use super::{BackingExecutor, Job};

/// Default queue capacity multiplier per worker.
const DEFAULT_QUEUE_MULTIPLIER: usize = 100;

/// A fixed-size thread pool with a bounded job queue.
///
/// Workers pull jobs from a shared queue and run them to completion. A
/// reserved worker loop submitted here occupies one pool thread for as long
/// as it stays parked, so the pool should be sized above the dispatcher's
/// capacity.
pub struct QueuedPool {
    /// Channel to send jobs to workers. `None` once shut down.
    job_tx: Mutex<Option<mpsc::SyncSender<Job>>>,
    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Number of workers.
    worker_count: usize,
    /// Queue capacity.
    queue_capacity: usize,
    /// Jobs submitted but not yet picked up by a worker.
    queued: Arc<AtomicUsize>,
    /// Jobs that panicked. The worker survives them.
    panicked: Arc<AtomicUsize>,
    /// Shutdown flag.
    shutdown: AtomicBool,
    /// Pool name for logging.
    name: String,
}

impl QueuedPool {
    /// Create a new pool with auto-calculated queue capacity.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads (0 = use CPU count)
    /// * `name` - Name for logging and thread names
    pub fn new(num_workers: usize, name: impl Into<String>) -> io::Result<Self> {
        let num_workers = if num_workers == 0 {
            num_cpus::get()
        } else {
            num_workers
        };
        Self::with_capacity(num_workers, num_workers * DEFAULT_QUEUE_MULTIPLIER, name)
    }

    /// Create a new pool with custom queue capacity.
    pub fn with_capacity(
        num_workers: usize,
        queue_capacity: usize,
        name: impl Into<String>,
    ) -> io::Result<Self> {
        let name = name.into();
        let (job_tx, job_rx) = mpsc::sync_channel::<Job>(queue_capacity);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let queued = Arc::new(AtomicUsize::new(0));
        let panicked = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::with_capacity(num_workers);

        for id in 0..num_workers {
            let rx = Arc::clone(&job_rx);
            let queued = Arc::clone(&queued);
            let panicked = Arc::clone(&panicked);

            let handle = thread::Builder::new()
                .name(format!("{}-{}", name, id))
                .spawn(move || {
                    Self::worker_loop(id, rx, queued, panicked);
                })?;

            workers.push(handle);
        }

        tracing::info!(
            pool = %name,
            workers = num_workers,
            capacity = queue_capacity,
            "queued pool created"
        );

        Ok(Self {
            job_tx: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            worker_count: num_workers,
            queue_capacity,
            queued,
            panicked,
            shutdown: AtomicBool::new(false),
            name,
        })
    }

    /// Worker thread main loop.
    fn worker_loop(
        id: usize,
        rx: Arc<Mutex<mpsc::Receiver<Job>>>,
        queued: Arc<AtomicUsize>,
        panicked: Arc<AtomicUsize>,
    ) {
        tracing::debug!(worker = id, "pool worker started");

        loop {
            let job = {
                let guard = rx.lock().unwrap_or_else(PoisonError::into_inner);
                guard.recv()
            };

            match job {
                Ok(job) => {
                    queued.fetch_sub(1, Ordering::SeqCst);
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        panicked.fetch_add(1, Ordering::SeqCst);
                        tracing::error!(
                            worker = id,
                            panic = %panic_message(payload.as_ref()),
                            "pool job panicked"
                        );
                    }
                }
                // Sender dropped by shutdown()
                Err(_) => break,
            }
        }

        tracing::debug!(worker = id, "pool worker stopped");
    }

    /// Get the number of workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Get the queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Get the number of jobs waiting for a worker.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Jobs that panicked since the pool was created.
    pub fn panicked(&self) -> usize {
        self.panicked.load(Ordering::SeqCst)
    }

    /// Get the pool name.
    pub fn pool_name(&self) -> &str {
        &self.name
    }

    /// Stop accepting jobs. Queued jobs still run.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::info!(pool = %self.name, "shutting down queued pool");

        // Workers exit once the queue drains and recv() sees the hang-up.
        self.job_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Wait for all workers to finish (call after shutdown).
    pub fn join(&self) {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        for worker in workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl BackingExecutor for QueuedPool {
    fn submit(&self, job: Job) -> SubmitResult<()> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(SubmitError::Shutdown);
        }

        let guard = self.job_tx.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.as_ref().ok_or(SubmitError::Shutdown)?;

        self.queued.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = tx.try_send(job) {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return match e {
                mpsc::TrySendError::Full(_) => Err(SubmitError::QueueFull {
                    capacity: self.queue_capacity,
                }),
                mpsc::TrySendError::Disconnected(_) => Err(SubmitError::Shutdown),
            };
        }

        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for QueuedPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
