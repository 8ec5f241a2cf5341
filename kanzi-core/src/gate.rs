//! The sequential gate: the acquire/release atomic by which block-pipeline
//! workers serialize access to the shared bit stream while transform and
//! entropy coding run concurrently (spec.md §5, GLOSSARY).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Condvar, Mutex};

/// Sentinel value published to [`SequentialGate`] when the pipeline has
/// been cancelled (an earlier block failed, or `close()` ran).
pub const CANCEL: i64 = -1;

/// A single-writer/single-reader-at-a-time gate keyed on a monotonically
/// increasing block id.
///
/// Each block-processing task blocks until `processed() == id - 1`, does
/// its (exclusive) work against the shared bit stream, then calls
/// [`SequentialGate::publish`] with its own id to release the next task.
/// Implemented with a condition variable rather than a busy-wait, which
/// spec.md §9 calls out as an equivalent strategy.
pub struct SequentialGate {
    processed: AtomicI64,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl SequentialGate {
    /// Create a gate whose next expected id is `first_id - 1`, i.e. the
    /// first call to [`Self::wait_for`] with `first_id` will proceed
    /// immediately.
    pub fn new(first_id: i64) -> Self {
        Self {
            processed: AtomicI64::new(first_id - 1),
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    /// Current processed-id value (may be [`CANCEL`]).
    pub fn processed(&self) -> i64 {
        self.processed.load(Ordering::Acquire)
    }

    /// Block until `processed() == id - 1` or the gate is cancelled.
    ///
    /// Returns `Err(())` if the gate was cancelled while waiting.
    pub fn wait_for(&self, id: i64) -> Result<(), ()> {
        let mut guard = self.lock.lock().unwrap();
        loop {
            let p = self.processed.load(Ordering::Acquire);
            if p == CANCEL {
                return Err(());
            }
            if p == id - 1 {
                return Ok(());
            }
            guard = self.condvar.wait(guard).unwrap();
        }
    }

    /// Publish `id` as processed and wake all waiters.
    pub fn publish(&self, id: i64) {
        let _guard = self.lock.lock().unwrap();
        self.processed.store(id, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Cancel the gate: every current and future waiter observes
    /// [`CANCEL`] and returns immediately.
    pub fn cancel(&self) {
        let _guard = self.lock.lock().unwrap();
        self.processed.store(CANCEL, Ordering::Release);
        self.condvar.notify_all();
    }

    /// True if the gate has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.processed() == CANCEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn strict_ordering_across_threads() {
        let gate = Arc::new(SequentialGate::new(1));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for id in (1..=8i64).rev() {
            let gate = gate.clone();
            let order = order.clone();
            handles.push(thread::spawn(move || {
                gate.wait_for(id).unwrap();
                order.lock().unwrap().push(id);
                gate.publish(id);
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn cancel_releases_waiters() {
        let gate = Arc::new(SequentialGate::new(1));
        gate.cancel();
        assert!(gate.wait_for(5).is_err());
        assert!(gate.is_cancelled());
    }
}
