//! Bounded worker pool with rotating buffer slots (spec.md §5): at most
//! `jobs` tasks run concurrently, one per slot out of `2 * jobs` total,
//! dispatched on a rayon thread pool. The [`kanzi_core::gate::SequentialGate`]
//! (not this module) is what enforces block-id ordering on the shared
//! bitstream; this module only bounds concurrency and collects results.

use kanzi_core::error::Result;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

/// Owns a rayon thread pool sized to `jobs` and the channel used to collect
/// per-block task outcomes in the order they complete (not block-id order;
/// callers needing strict order rely on the sequential gate instead).
pub struct BlockPool {
    pool: Arc<ThreadPool>,
    jobs: usize,
}

impl BlockPool {
    pub fn new(jobs: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| kanzi_core::error::KanziError::Other(e.to_string()))?;
        Ok(Self {
            pool: Arc::new(pool),
            jobs,
        })
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run `task` on the pool, blocking the caller until it completes.
    /// Submission itself does not block beyond rayon's own scheduling;
    /// backpressure (awaiting a slot before reuse) is the caller's
    /// responsibility, mirroring the `2*jobs`-slot rotation described in
    /// spec.md §5.
    pub fn spawn<F, T>(&self, task: F) -> crossbeam_channel::Receiver<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.pool.spawn(move || {
            let _ = tx.send(task());
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawned_tasks_all_complete() {
        let pool = BlockPool::new(4).unwrap();
        let receivers: Vec<_> = (0..16)
            .map(|i| pool.spawn(move || i * i))
            .collect();
        let results: Vec<i32> = receivers.into_iter().map(|r| r.recv().unwrap()).collect();
        assert_eq!(results, (0..16).map(|i| i * i).collect::<Vec<_>>());
    }
}
