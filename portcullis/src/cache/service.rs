//! The size-bounded LRU cache: `Index` + `Store` + an on-demand populator.
//!
//! `Cache::get` is the one operation this module exposes, and it is the
//! entire contract: look in `Store`, touch `Index` on hit, otherwise call
//! `on_missing`, evict until the new value fits, and commit.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::error::CacheError;
use super::index::Index;
use super::store::Store;

/// Boxed future for the dyn-compatible `OnMissing` populate callback.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Populates an absent key from upstream. Implemented by the fetch
/// orchestrator (`source::Fanout`); swapped for mocks in tests.
pub trait OnMissing: Send + Sync {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, CacheError>>;
}

impl<F> OnMissing for F
where
    F: Send + Sync + for<'a> Fn(&'a str) -> BoxFuture<'a, Result<Vec<u8>, CacheError>>,
{
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, CacheError>> {
        self(key)
    }
}

/// Outcome of `Cache::get`. `value` is empty for a clean miss.
#[derive(Debug, Clone)]
pub struct CacheResult {
    pub cache_used: bool,
    pub value_cached: bool,
    pub deleted: u32,
    pub value: Vec<u8>,
}

impl CacheResult {
    /// The `X-Cache` header value: `"<cache_used>,<value_cached>,<deleted>"`.
    pub fn header(&self) -> String {
        format!("{},{},{}", self.cache_used, self.value_cached, self.deleted)
    }
}

/// Composes `Index` + `Store` with a populate callback, enforcing a hard
/// byte budget via LRU eviction.
pub struct Cache {
    index: Index,
    store: Store,
    max: i64,
    on_missing: Arc<dyn OnMissing>,
}

impl Cache {
    pub fn new(store: Store, max: i64, on_missing: Arc<dyn OnMissing>) -> Self {
        Self {
            index: Index::new(),
            store,
            max,
            on_missing,
        }
    }

    /// Current total size of committed cache entries.
    pub fn size(&self) -> i64 {
        self.index.size()
    }

    pub async fn get(&self, key: &str) -> Result<CacheResult, CacheError> {
        assert!(!key.is_empty(), "Cache::get called with an empty key");

        match self.store.get(key) {
            Ok(Some(value)) => {
                self.index.reset(key, value.len() as i64, now());
                return Ok(CacheResult {
                    cache_used: true,
                    value_cached: true,
                    deleted: 0,
                    value,
                });
            }
            Ok(None) => {}
            Err(e) => panic!("store corruption on get({key}): {e}"),
        }

        let value = self.on_missing.fetch(key).await?;

        if value.is_empty() {
            return Ok(CacheResult {
                cache_used: false,
                value_cached: false,
                deleted: 0,
                value: Vec::new(),
            });
        }

        let n = value.len() as i64;
        if self.max <= 0 || n >= self.max {
            // Too large (or caching disabled) — deliver without storing.
            return Ok(CacheResult {
                cache_used: false,
                value_cached: false,
                deleted: 0,
                value,
            });
        }

        let mut deleted = 0u32;
        while self.index.size() + n > self.max {
            let victim = self.index.least_read();
            debug_assert!(!victim.is_empty(), "index empty while size() + n > max");
            self.store.delete(&victim)?;
            self.index.delete(&victim);
            deleted += 1;
        }

        if self.store.put(key, &value).is_err() {
            // Swallowed per spec: the value is still delivered, uncached.
            return Ok(CacheResult {
                cache_used: false,
                value_cached: false,
                deleted,
                value,
            });
        }

        self.index.reset(key, n, now());
        Ok(CacheResult {
            cache_used: false,
            value_cached: true,
            deleted,
            value,
        })
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
