//! # Run Locks
//!
//! Per-run mutual exclusion inside one process. Transitions for the same run
//! are serialized; different runs never contend.
//!
//! This is the in-process half of the locking story. Across processes the
//! store's row lock and conditional updates do the same job.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

pub type RunLockGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct RunLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `run_id`
    pub async fn acquire(&self, run_id: Uuid) -> RunLockGuard {
        // Clone out of the map before awaiting so no shard lock is held
        let lock = self.locks.entry(run_id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop the entry for `run_id` if nobody holds or awaits it
    pub fn release_idle(&self, run_id: Uuid) {
        self.locks
            .remove_if(&run_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
