//! Worker pool (component M): a bounded pool of OS threads with a blocking
//! `schedule` and clean shutdown.
//!
//! Grounded on `concurrency/thread_pool.{hpp,cpp}`. This is distinct from
//! the `rayon` fan-out used for per-source/per-repo embarrassingly parallel
//! work (component K): the worker pool models a saturating queue with a
//! fixed worker count, used where callers need a future-backed handle to an
//! individual unit of work (for instance scheduling per-child-repo fetches
//! from the CLI driver).

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    senders: Vec<SyncSender<Job>>,
    handles: Vec<JoinHandle<()>>,
    next: Mutex<usize>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        let mut senders = Vec::with_capacity(max_workers);
        let mut handles = Vec::with_capacity(max_workers);
        for _ in 0..max_workers {
            // A bound of 0 makes `send` rendezvous with the worker, giving
            // `schedule` its "blocks while saturated" behaviour.
            let (tx, rx): (SyncSender<Job>, Receiver<Job>) = mpsc::sync_channel(0);
            let handle = std::thread::spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            });
            senders.push(tx);
            handles.push(handle);
        }
        WorkerPool {
            senders,
            handles,
            next: Mutex::new(0),
        }
    }

    /// Submits `task`, blocking until a worker accepts it. Returns a handle
    /// whose `join` yields the task's result.
    pub fn schedule<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::channel();
        let job: Job = Box::new(move || {
            let value = task();
            let _ = result_tx.send(value);
        });

        let worker = {
            let mut next = self.next.lock().expect("worker pool mutex poisoned");
            let idx = *next;
            *next = (idx + 1) % self.senders.len();
            idx
        };
        let _ = self.senders[worker].send(job);

        TaskHandle { result_rx }
    }

    /// Shuts down cleanly: outstanding tasks complete before this returns.
    pub fn shutdown(self) {
        drop(self.senders);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

pub struct TaskHandle<T> {
    result_rx: Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub fn join(self) -> Option<T> {
        self.result_rx.recv().ok()
    }
}

/// Shared, clonable handle to a pool, for callers that need to hand it to
/// multiple producers.
#[derive(Clone)]
pub struct SharedWorkerPool(Arc<WorkerPool>);

impl SharedWorkerPool {
    pub fn new(max_workers: usize) -> Self {
        SharedWorkerPool(Arc::new(WorkerPool::new(max_workers)))
    }

    pub fn schedule<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        self.0.schedule(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn schedule_runs_task_and_returns_result() {
        let pool = WorkerPool::new(2);
        let handle = pool.schedule(|| 2 + 2);
        assert_eq!(handle.join(), Some(4));
        pool.shutdown();
    }

    #[test]
    fn multiple_tasks_all_complete_before_shutdown() {
        let pool = WorkerPool::new(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                pool.schedule(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        for h in handles {
            h.join();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 8);
        pool.shutdown();
    }
}
