//! Bounded background worker pool.
//!
//! # Responsibilities
//! - Run relay jobs off the request path
//! - Cap concurrent jobs; extra jobs wait in one FIFO queue
//! - Let shutdown wait for queued and running jobs
//!
//! # Design Decisions
//! - A fixed set of `capacity` worker loops pulls from a single queue
//! - A panicking job is logged and its worker moves on to the next one
//! - Jobs are never cancelled; `drain` only waits, with a deadline

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex, Notify};

/// A unit of background work.
pub type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Capability to run work in the background.
pub trait BackgroundRunner: Send + Sync {
    /// Schedule `job`. Must return without waiting for it.
    fn run(&self, job: Job);
}

/// Counts scheduled jobs and wakes drainers when the count hits zero.
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// RAII guard decrementing the in-flight count, even if the job panics.
struct InFlightGuard {
    in_flight: Arc<InFlight>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.in_flight.idle.notify_waiters();
        }
    }
}

/// A job waiting in the queue, counted until it finishes or is dropped.
struct Queued {
    job: Job,
    guard: InFlightGuard,
}

type JobQueue = Arc<Mutex<mpsc::UnboundedReceiver<Queued>>>;

/// Fixed-size pool of worker loops fed by a FIFO queue.
#[derive(Clone)]
pub struct WorkerPool {
    queue: mpsc::UnboundedSender<Queued>,
    capacity: usize,
    in_flight: Arc<InFlight>,
}

impl WorkerPool {
    /// Create a pool running at most `capacity` jobs at once.
    ///
    /// Spawns the worker loops, so it must be called inside a tokio runtime.
    /// Workers exit once every handle to the pool is dropped.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let queue: JobQueue = Arc::new(Mutex::new(rx));

        for worker in 0..capacity {
            tokio::spawn(worker_loop(worker, queue.clone()));
        }

        Self {
            queue: tx,
            capacity,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Jobs scheduled and not yet finished (running or queued).
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait until every scheduled job has finished.
    ///
    /// Returns `false` if jobs were still pending when `timeout` elapsed.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait_idle = async {
            loop {
                // Registered before the check so a concurrent wake is not lost.
                let idle = self.in_flight.idle.notified();
                if self.in_flight() == 0 {
                    return;
                }
                idle.await;
            }
        };

        match tokio::time::timeout(timeout, wait_idle).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    pending = self.in_flight(),
                    "Worker pool drain timed out, abandoning pending jobs"
                );
                false
            }
        }
    }
}

/// Pull jobs off the queue one at a time until the queue closes.
async fn worker_loop(worker: usize, queue: JobQueue) {
    loop {
        // Only the idle worker holding the lock waits on the channel.
        let next = queue.lock().await.recv().await;
        let Some(Queued { job, guard }) = next else {
            break;
        };

        if let Err(e) = tokio::spawn(job).await {
            tracing::error!(worker, error = %e, "Background job panicked");
        }
        drop(guard);
    }
    tracing::debug!(worker, "Worker loop exiting");
}

impl BackgroundRunner for WorkerPool {
    fn run(&self, job: Job) {
        self.in_flight.count.fetch_add(1, Ordering::SeqCst);
        let queued = Queued {
            job,
            guard: InFlightGuard {
                in_flight: self.in_flight.clone(),
            },
        };

        // A rejected job drops its guard with it.
        if self.queue.send(queued).is_err() {
            tracing::error!("Worker pool queue closed, dropping job");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.capacity)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
