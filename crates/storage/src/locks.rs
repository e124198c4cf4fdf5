//! Single-flight locking per `(station, timestamp)`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use radar_common::ScanTimestamp;
use tokio::sync::Mutex as AsyncMutex;

type ScanKey = (String, ScanTimestamp);

/// Map of per-scan async mutexes.
///
/// Entries are weak, so a lock disappears once no task holds it; stale
/// entries are pruned on the next lookup.
#[derive(Debug, Default)]
pub struct ScanLocks {
    inner: Mutex<HashMap<ScanKey, Weak<AsyncMutex<()>>>>,
}

impl ScanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding one scan. Callers hold the returned `Arc` for as
    /// long as they hold the guard.
    pub fn lock_for(&self, station: &str, timestamp: &ScanTimestamp) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.retain(|_, weak| weak.strong_count() > 0);

        let key = (station.to_string(), timestamp.clone());
        if let Some(existing) = map.get(&key).and_then(Weak::upgrade) {
            return existing;
        }

        let lock = Arc::new(AsyncMutex::new(()));
        map.insert(key, Arc::downgrade(&lock));
        lock
    }

    /// Number of scans with a live lock.
    pub fn active(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
