use crate::engine::EngineSnapshot;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Hands engine snapshots from the poll loop to readers on other threads.
///
/// The poll loop is the only writer. The slot lock is held just long enough
/// to copy a snapshot in or out.
pub struct SnapshotExchange {
    latest: Mutex<EngineSnapshot>,
    published: AtomicU64,
}

impl SnapshotExchange {
    pub fn new() -> Self {
        Self {
            latest: Mutex::new(EngineSnapshot::default()),
            published: AtomicU64::new(0),
        }
    }

    /// Called by the poll loop.
    pub fn publish(&self, snapshot: EngineSnapshot) {
        let mut slot = self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = snapshot;
        self.published.fetch_add(1, Ordering::Release);
    }

    pub fn read(&self) -> EngineSnapshot {
        *self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of publishes so far. A reader that sees this unchanged between
    /// two looks knows the poll loop has not advanced.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}

impl Default for SnapshotExchange {
    fn default() -> Self {
        Self::new()
    }
}
