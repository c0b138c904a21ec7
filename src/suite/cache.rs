use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::types::TestSuite;

#[derive(Debug)]
struct CachedSuite {
    suite: Arc<TestSuite>,
    loaded_at: Instant,
}

/// Loaded suites keyed by suite id, owned by one loader.
///
/// Entries older than `ttl` are treated as misses; without a TTL they live
/// until invalidated.
#[derive(Debug, Default)]
pub struct SuiteCache {
    ttl: Option<Duration>,
    entries: Mutex<HashMap<String, CachedSuite>>,
}

impl SuiteCache {
    #[must_use]
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<TestSuite>> {
        let mut entries = self.lock();
        let expired = match entries.get(id) {
            Some(entry) => self
                .ttl
                .is_some_and(|ttl| entry.loaded_at.elapsed() >= ttl),
            None => return None,
        };
        if expired {
            entries.remove(id);
            return None;
        }
        entries.get(id).map(|entry| Arc::clone(&entry.suite))
    }

    pub fn insert(&self, id: &str, suite: Arc<TestSuite>) {
        self.lock().insert(
            id.to_owned(),
            CachedSuite {
                suite,
                loaded_at: Instant::now(),
            },
        );
    }

    /// Drops one entry; returns whether it was present.
    pub fn invalidate(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are plain data, so a poisoned lock still holds a usable map.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CachedSuite>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
