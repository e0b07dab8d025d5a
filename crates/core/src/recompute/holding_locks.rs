//! Per-holding mutual exclusion for read-modify-write cycles.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per holding id.
///
/// Cloning shares the registry, so every service that mutates holdings must
/// be handed the same instance.
#[derive(Clone, Default)]
pub struct HoldingLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl HoldingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `holding_id`. Released when the guard drops.
    pub async fn acquire(&self, holding_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(holding_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the entry for `holding_id` if nobody holds or waits for it.
    pub fn release_idle(&self, holding_id: &str) {
        self.locks
            .remove_if(holding_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
