//! Background thread pool for detector submissions.
//!
//! Uses work-stealing deques so detection never blocks the frame callback:
//! - New submissions pushed to the global injector
//! - Idle workers steal from each other, oldest tasks first
//!
//! Epoch mechanism cancels stale submissions: a screen reset or teardown
//! bumps the epoch, and any job tagged with an older epoch is skipped at
//! execution time instead of mutating state it no longer owns.

use crossbeam::deque::{Injector, Worker};
use log::trace;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared epoch counter handle.
///
/// Cloned into update contexts and submission jobs. Bumping invalidates
/// every job and result tagged with an earlier value.
#[derive(Debug, Clone, Default)]
pub struct EpochHandle(Arc<AtomicU64>);

impl EpochHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Invalidate all in-flight work tagged with the previous epoch.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Worker pool with work-stealing and epoch-based cancellation.
pub struct Workers {
    injector: Arc<Injector<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
    epoch: EpochHandle,
    shutdown: Arc<AtomicBool>,
}

impl Workers {
    /// Create the pool. Recommended size: `num_cpus::get() / 2`, detection
    /// is bursty and the frame callback wants headroom.
    pub fn new(num_threads: usize, epoch: EpochHandle) -> Self {
        let injector: Arc<Injector<Job>> = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers_local: Vec<Worker<Job>> = Vec::new();
        let mut stealers = Vec::new();
        let mut handles = Vec::new();

        for _ in 0..num_threads {
            let worker: Worker<Job> = Worker::new_fifo();
            stealers.push(worker.stealer());
            workers_local.push(worker);
        }

        for (worker_id, worker) in workers_local.into_iter().enumerate() {
            let injector = Arc::clone(&injector);
            let shutdown = Arc::clone(&shutdown);
            let stealers = stealers.clone();

            let handle = thread::Builder::new()
                .name(format!("coreshow-worker-{}", worker_id))
                .spawn(move || {
                    trace!("Worker {} started", worker_id);

                    loop {
                        // Own queue first, then the injector, then steal.
                        if let Some(job) = worker.pop() {
                            job();
                            continue;
                        }
                        if let Some(job) = injector.steal().success() {
                            job();
                            continue;
                        }
                        let mut found_work = false;
                        for stealer in &stealers {
                            if let Some(job) = stealer.steal().success() {
                                job();
                                found_work = true;
                                break;
                            }
                        }
                        if found_work {
                            continue;
                        }

                        if shutdown.load(Ordering::Relaxed) {
                            break;
                        }

                        // No work: short sleep instead of spinning.
                        thread::sleep(std::time::Duration::from_millis(1));
                    }

                    trace!("Worker {} stopped", worker_id);
                })
                .expect("Failed to spawn worker thread");

            handles.push(handle);
        }

        trace!("Workers initialized: {} threads (work-stealing)", num_threads);

        Self {
            injector,
            handles,
            epoch,
            shutdown,
        }
    }

    pub fn epoch(&self) -> &EpochHandle {
        &self.epoch
    }

    /// Execute a closure on a worker thread.
    pub fn execute<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.injector.push(Box::new(f));
    }

    /// Execute a closure only if the epoch still matches at execution time.
    ///
    /// The check happens when a worker picks the job up, not at enqueue
    /// time, so a reset between submission and execution cancels the job.
    pub fn execute_with_epoch<F>(&self, epoch: u64, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = self.epoch.clone();
        let wrapped = move || {
            if handle.current() == epoch {
                f();
            }
            // Stale epoch: silently skip.
        };
        self.injector.push(Box::new(wrapped));
    }
}

impl Drop for Workers {
    fn drop(&mut self) {
        use std::time::{Duration, Instant};

        let num_threads = self.handles.len();
        trace!("Workers shutting down ({} threads)...", num_threads);

        self.shutdown.store(true, Ordering::SeqCst);

        // Epoch was bumped by teardown, so pending epoch-checked jobs are
        // skipped and threads drain quickly. Timeout is a safety net.
        let deadline = Instant::now() + Duration::from_millis(500);

        let handles = std::mem::take(&mut self.handles);
        for handle in handles {
            while !handle.is_finished() {
                if Instant::now() >= deadline {
                    trace!("Shutdown timeout reached, exiting anyway");
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
            let _ = handle.join();
        }

        trace!("All {} workers stopped gracefully", num_threads);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;
    use std::time::{Duration, Instant};

    fn wait_for(cond: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !cond() {
            assert!(Instant::now() < deadline, "timed out waiting for workers");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_execute_runs_job() {
        let workers = Workers::new(2, EpochHandle::new());
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);
        workers.execute(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        wait_for(|| counter.load(Ordering::SeqCst) == 1);
    }

    #[test]
    fn test_stale_epoch_skipped() {
        let epoch = EpochHandle::new();
        let workers = Workers::new(1, epoch.clone());
        let counter = Arc::new(AtomicI32::new(0));

        let stale = epoch.current();
        epoch.bump();

        let c = Arc::clone(&counter);
        workers.execute_with_epoch(stale, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        // Sentinel job with the live epoch proves the queue drained.
        let c = Arc::clone(&counter);
        workers.execute_with_epoch(epoch.current(), move || {
            c.fetch_add(100, Ordering::SeqCst);
        });

        wait_for(|| counter.load(Ordering::SeqCst) >= 100);
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }
}
