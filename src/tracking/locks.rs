//! Per-entity writer locks
//!
//! Writers for one entity handle run one at a time within a tracker.
//! Writers for different handles never wait on each other. Entries are
//! dropped once no writer holds or awaits them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::errors::{TrackError, TrackResult};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Table of async locks keyed by entity handle
#[derive(Debug, Default)]
pub struct HandleLocks {
    table: LockTable,
}

/// Exclusive right to write one entity; released on drop
#[derive(Debug)]
pub struct HandleGuard {
    handle: String,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl HandleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `handle`
    pub async fn lock(&self, handle: &str) -> TrackResult<HandleGuard> {
        let lock = {
            let mut table = self
                .table
                .lock()
                .map_err(|e| TrackError::Store(format!("lock table poisoned: {}", e)))?;
            Arc::clone(table.entry(handle.to_string()).or_default())
        };

        let guard = lock.lock_owned().await;
        Ok(HandleGuard {
            handle: handle.to_string(),
            table: Arc::clone(&self.table),
            guard: Some(guard),
        })
    }

    /// Number of handles currently locked or awaited
    pub fn active(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or(0)
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if let Ok(mut table) = self.table.lock() {
            // table entry + this guard's clone
            let idle = table
                .get(&self.handle)
                .map_or(false, |lock| Arc::strong_count(lock) <= 2);
            if idle {
                table.remove(&self.handle);
            }
        }
        self.guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_handle_is_exclusive() {
        let locks = Arc::new(HandleLocks::new());
        let first = locks.lock("c/a").await.unwrap();

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("c/a").await.unwrap();
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        contender.await.unwrap();
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_different_handles_do_not_block() {
        let locks = HandleLocks::new();
        let _a = locks.lock("c/a").await.unwrap();
        let _b = locks.lock("c/b").await.unwrap();
        assert_eq!(locks.active(), 2);
    }
}
