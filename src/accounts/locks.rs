//! Per-owner serialization for strict limit enforcement
//!
//! Holding an owner's lock across count, entitlement lookup and create stops
//! two adds by the same owner from both passing the check. Only adds inside
//! this process are serialized.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Prune idle entries once the table grows past this many owners
const PRUNE_THRESHOLD: usize = 1024;

/// Table of async mutexes keyed by owner id
#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `owner_id`
    pub async fn acquire(&self, owner_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };

            if locks.len() >= PRUNE_THRESHOLD {
                // Only the table holds a reference: nobody waits on it
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }

            Arc::clone(
                locks
                    .entry(owner_id.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };

        lock.lock_owned().await
    }

    /// Number of owners currently tracked
    pub fn len(&self) -> usize {
        match self.locks.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
