//! Per-client attempt counters bounded by time and capacity.
//!
//! Every entry lives for a fixed window after its last write and the store never
//! holds more than `capacity` keys; when full, the least recently used live key is
//! evicted, after expired entries at the LRU end are dropped. Reads always check
//! expiry so an expired entry is gone even before the cleanup task drops it
//! physically.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// Errors raised while constructing a store.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("cache capacity must be a positive integer")]
    ZeroCapacity,
    #[error("entry ttl must be a positive duration")]
    ZeroTtl,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    count: u32,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Counter store keyed by client identity.
///
/// All operations take the internal lock once, so callers never need their own
/// synchronization. Read-modify-write goes through [`AttemptStore::update`].
pub struct AttemptStore {
    inner: Mutex<LruCache<String, Entry>>,
    ttl: Duration,
}

impl AttemptStore {
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self, StoreError> {
        let cap = NonZeroUsize::new(capacity).ok_or(StoreError::ZeroCapacity)?;
        if ttl.is_zero() {
            return Err(StoreError::ZeroTtl);
        }
        Ok(Self {
            inner: Mutex::new(LruCache::new(cap)),
            ttl,
        })
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().cap().get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current count for `key`, or zero when absent or expired.
    pub fn get(&self, key: &str) -> u32 {
        let now = Instant::now();
        let mut cache = self.inner.lock();
        live_count(&mut cache, key, now)
    }

    /// Insert or overwrite `key`, restarting its expiry window.
    pub fn set(&self, key: &str, count: u32) {
        self.update(key, |_| count);
    }

    /// Atomically replace the count of `key` with `f(current)`.
    ///
    /// The read, the transform and the write happen under a single lock
    /// acquisition, so concurrent updates of the same key never lose a write.
    /// The entry's expiry restarts at now + ttl.
    pub fn update<F>(&self, key: &str, f: F) -> u32
    where
        F: FnOnce(u32) -> u32,
    {
        let now = Instant::now();
        let mut cache = self.inner.lock();
        let next = f(live_count(&mut cache, key, now));

        if !cache.contains(key) && cache.len() >= cache.cap().get() {
            let dropped = drop_expired_tail(&mut cache, now);
            if dropped > 0 {
                debug!(target: "attempt-store", dropped, "dropped expired entries to make room");
            }
        }

        let entry = Entry {
            count: next,
            expires_at: now + self.ttl,
        };
        if let Some((evicted, _)) = cache.push(key.to_owned(), entry) {
            if evicted != key {
                debug!(target: "attempt-store", %evicted, "evicted least recently used entry");
            }
        }
        next
    }

    pub fn increment(&self, key: &str) -> u32 {
        self.update(key, |count| count.saturating_add(1))
    }

    /// Drop every expired entry and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut cache = self.inner.lock();
        purge_locked(&mut cache, now)
    }
}

fn live_count(cache: &mut LruCache<String, Entry>, key: &str, now: Instant) -> u32 {
    match cache.get(key).map(|entry| (entry.count, entry.is_expired(now))) {
        Some((count, false)) => count,
        Some((_, true)) => {
            cache.pop(key);
            0
        }
        None => 0,
    }
}

/// Pop expired entries off the LRU end until a live one is found.
///
/// Each entry is popped at most once, so inserts stay O(1) amortized. Expired
/// entries further up the list are left to reads and the periodic sweep.
fn drop_expired_tail(cache: &mut LruCache<String, Entry>, now: Instant) -> usize {
    let mut removed = 0;
    while cache
        .peek_lru()
        .is_some_and(|(_, entry)| entry.is_expired(now))
    {
        cache.pop_lru();
        removed += 1;
    }
    removed
}

fn purge_locked(cache: &mut LruCache<String, Entry>, now: Instant) -> usize {
    let stale: Vec<String> = cache
        .iter()
        .filter(|(_, entry)| entry.is_expired(now))
        .map(|(key, _)| key.clone())
        .collect();
    for key in &stale {
        cache.pop(key.as_str());
    }
    stale.len()
}
