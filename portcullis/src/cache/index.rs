//! In-memory LRU index: key → (last-read unix seconds, value byte size).
//!
//! The index is the source of truth for eviction order and the running size
//! budget. It never stores the cached bytes themselves — that's the `Store`'s
//! job. See `cache::Cache::get` for how the two are composed.

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::DashMap;

/// One tracked entry: when the key was last read, and how large its value is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IndexEntry {
    last_read: i64,
    value_size: i64,
}

/// Concurrent key → `IndexEntry` map with an atomically maintained size sum.
///
/// `DashMap` gives per-key CAS semantics; the running sum is kept in a
/// separate atomic rather than recomputed by scanning, so `size()` is O(1).
#[derive(Default)]
pub struct Index {
    entries: DashMap<String, IndexEntry>,
    size: AtomicI64,
}

impl Index {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            size: AtomicI64::new(0),
        }
    }

    /// Upsert `key` with `size`, touching `last_read` to now. Used both to
    /// install a freshly populated value and to touch an entry on cache hit.
    pub fn reset(&self, key: &str, size: i64, now: i64) {
        let entry = IndexEntry {
            last_read: now,
            value_size: size,
        };
        match self.entries.insert(key.to_string(), entry) {
            Some(prev) => {
                self.size.fetch_add(size - prev.value_size, Ordering::SeqCst);
            }
            None => {
                self.size.fetch_add(size, Ordering::SeqCst);
            }
        }
    }

    /// Remove `key`, adjusting the size sum. No-op if the key is absent.
    pub fn delete(&self, key: &str) {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.size.fetch_sub(entry.value_size, Ordering::SeqCst);
        }
    }

    /// Key with the minimum `last_read`, ties broken by larger `value_size`
    /// (frees more room per eviction). Empty string if the index is empty.
    ///
    /// This scans the live map without a global lock; a concurrent eviction
    /// may already have removed the returned key by the time the caller acts
    /// on it. Callers must tolerate that (`delete` is idempotent).
    pub fn least_read(&self) -> String {
        let mut best: Option<(String, IndexEntry)> = None;
        for item in self.entries.iter() {
            let (key, entry) = (item.key().clone(), *item.value());
            best = match best {
                None => Some((key, entry)),
                Some((best_key, best_entry)) => {
                    if entry.last_read < best_entry.last_read
                        || (entry.last_read == best_entry.last_read
                            && entry.value_size > best_entry.value_size)
                    {
                        Some((key, entry))
                    } else {
                        Some((best_key, best_entry))
                    }
                }
            };
        }
        best.map(|(key, _)| key).unwrap_or_default()
    }

    /// Current sum of `value_size` across all entries. Never negative.
    pub fn size(&self) -> i64 {
        let sum = self.size.load(Ordering::SeqCst);
        debug_assert!(sum >= 0, "index size went negative: {sum}");
        sum
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
