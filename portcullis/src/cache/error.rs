//! Errors surfaced by `Cache::get`.

use thiserror::Error;

use super::store::StoreError;

/// Errors that can occur while populating the cache from upstream.
#[derive(Debug, Error)]
pub enum CacheError {
    /// `on_missing` (the upstream fan-out) failed.
    #[error("upstream fetch failed: {0}")]
    Populate(String),

    /// `Store::delete` failed mid-eviction. Per spec this aborts the
    /// populate; any eviction work already performed is not rolled back.
    #[error("eviction failed: {0}")]
    Eviction(#[from] StoreError),
}
