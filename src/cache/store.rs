//! Cache store backends.
//!
//! The store is an injectable object with an explicit lifecycle: construct
//! it at application start, hand it to the manager, clear it on teardown.
//! Nothing here is a module-level singleton, so tests get isolated stores.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use super::entry::CacheEntry;

/// Backend holding cache entries by hashed resource key.
pub trait CacheStore: Send + Sync + 'static {
  /// Look up an entry. Never fetches.
  fn get(&self, key_hash: &str) -> Option<CacheEntry>;

  /// Insert or replace the entry for a key.
  fn put(&self, key_hash: &str, entry: CacheEntry);

  /// Remove a single entry.
  fn remove(&self, key_hash: &str);

  /// Evict entries older than the GC window as of `now`. Returns the
  /// number evicted. The GC window is independent of staleness: stale
  /// entries survive sweeps until the window passes, so they remain
  /// servable as stale-if-error fallbacks.
  fn sweep(&self, now: DateTime<Utc>) -> usize;

  /// Drop every entry.
  fn clear(&self);

  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Process-wide in-memory store on a concurrent map.
pub struct MemoryStore {
  entries: DashMap<String, CacheEntry>,
  gc_window: Duration,
}

impl MemoryStore {
  /// Default GC window: entries vanish a day after they were fetched.
  pub fn new() -> Self {
    Self::with_gc_window(Duration::hours(24))
  }

  pub fn with_gc_window(gc_window: Duration) -> Self {
    Self {
      entries: DashMap::new(),
      gc_window,
    }
  }
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl CacheStore for MemoryStore {
  fn get(&self, key_hash: &str) -> Option<CacheEntry> {
    self.entries.get(key_hash).map(|e| e.value().clone())
  }

  fn put(&self, key_hash: &str, entry: CacheEntry) {
    self.entries.insert(key_hash.to_string(), entry);
  }

  fn remove(&self, key_hash: &str) {
    self.entries.remove(key_hash);
  }

  fn sweep(&self, now: DateTime<Utc>) -> usize {
    let before = self.entries.len();
    self
      .entries
      .retain(|_, entry| now - entry.fetched_at < self.gc_window);
    let evicted = before - self.entries.len();
    if evicted > 0 {
      debug!(evicted, "gc sweep evicted cache entries");
    }
    evicted
  }

  fn clear(&self) {
    self.entries.clear();
  }

  fn len(&self) -> usize {
    self.entries.len()
  }
}

/// Store that caches nothing. Every lookup misses and every write is
/// discarded; useful for disabling caching without touching call sites.
pub struct NoopStore;

impl CacheStore for NoopStore {
  fn get(&self, _key_hash: &str) -> Option<CacheEntry> {
    None
  }

  fn put(&self, _key_hash: &str, _entry: CacheEntry) {}

  fn remove(&self, _key_hash: &str) {}

  fn sweep(&self, _now: DateTime<Utc>) -> usize {
    0
  }

  fn clear(&self) {}

  fn len(&self) -> usize {
    0
  }
}
