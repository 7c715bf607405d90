//! Sequential upstream fan-out: tries each configured source in declared
//! order, falling through "no such key" sentinels, collapsing any other
//! failures into the last one seen.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{BoxFuture, CacheError, OnMissing};

use super::{ObjectFetcher, SourceError};

struct Entry {
    name: String,
    root: String,
    fetcher: Arc<dyn ObjectFetcher>,
    timeout: Option<Duration>,
}

/// Orchestrates a list of `ObjectFetcher`s, supplying the `OnMissing`
/// callback the cache populates from.
pub struct Fanout {
    entries: Vec<Entry>,
}

impl Fanout {
    pub fn builder() -> FanoutBuilder {
        FanoutBuilder { entries: Vec::new() }
    }

    /// Try each source in order; the first non-empty success wins.
    ///
    /// Returns `Ok(vec![])` for a clean miss (no source had the key and no
    /// source errored), or the last error seen if any source failed for a
    /// reason other than "no such key".
    pub async fn fetch(&self, key: &str) -> Result<Vec<u8>, SourceError> {
        let mut last: Option<SourceError> = None;

        for entry in &self.entries {
            let full_key = format!("{}{}", entry.root, key);
            let attempt = entry.fetcher.fetch(&full_key);
            let result = match entry.timeout {
                Some(d) => match tokio::time::timeout(d, attempt).await {
                    Ok(r) => r,
                    Err(_) => {
                        debug!(source = %entry.name, key, "upstream timed out");
                        last = Some(SourceError::Cancelled);
                        continue;
                    }
                },
                None => attempt.await,
            };

            match result {
                Ok(Some(bytes)) if !bytes.is_empty() => return Ok(bytes),
                Ok(Some(_)) | Ok(None) => {
                    debug!(source = %entry.name, key, "no such key, trying next source");
                }
                Err(e) => {
                    warn!(source = %entry.name, key, error = %e, "upstream fetch failed");
                    last = Some(e);
                }
            }
        }

        match last {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

/// Adapts `Fanout` to the cache's populate callback, collapsing any upstream
/// error into the cache's own error type.
impl OnMissing for Fanout {
    fn fetch<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, CacheError>> {
        Box::pin(async move {
            self.fetch(key)
                .await
                .map_err(|e| CacheError::Populate(e.to_string()))
        })
    }
}

pub struct FanoutBuilder {
    entries: Vec<Entry>,
}

impl FanoutBuilder {
    pub fn source(
        mut self,
        name: impl Into<String>,
        root: impl Into<String>,
        fetcher: Arc<dyn ObjectFetcher>,
        timeout: Option<Duration>,
    ) -> Self {
        self.entries.push(Entry {
            name: name.into(),
            root: root.into(),
            fetcher,
            timeout,
        });
        self
    }

    pub fn build(self) -> Fanout {
        Fanout { entries: self.entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(Result<Option<Vec<u8>>, SourceError>);

    #[async_trait]
    impl ObjectFetcher for Fixed {
        async fn fetch(&self, _key: &str) -> Result<Option<Vec<u8>>, SourceError> {
            self.0.clone()
        }
    }

    impl Clone for SourceError {
        fn clone(&self) -> Self {
            match self {
                SourceError::Upstream(s) => SourceError::Upstream(s.clone()),
                SourceError::LengthMismatch { declared, actual } => {
                    SourceError::LengthMismatch { declared: *declared, actual: *actual }
                }
                SourceError::Cancelled => SourceError::Cancelled,
            }
        }
    }

    #[tokio::test]
    async fn first_non_empty_success_wins() {
        let fanout = Fanout::builder()
            .source("a", "", Arc::new(Fixed(Ok(None))), None)
            .source("b", "", Arc::new(Fixed(Ok(Some(b"data".to_vec())))), None)
            .build();
        let result = fanout.fetch("key").await.unwrap();
        assert_eq!(result, b"data");
    }

    #[tokio::test]
    async fn all_miss_is_clean_miss() {
        let fanout = Fanout::builder()
            .source("a", "", Arc::new(Fixed(Ok(None))), None)
            .source("b", "", Arc::new(Fixed(Ok(None))), None)
            .build();
        let result = fanout.fetch("key").await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn non_miss_error_is_remembered_and_returned() {
        let fanout = Fanout::builder()
            .source("a", "", Arc::new(Fixed(Err(SourceError::Upstream("boom".into())))), None)
            .source("b", "", Arc::new(Fixed(Ok(None))), None)
            .build();
        let err = fanout.fetch("key").await.unwrap_err();
        assert!(matches!(err, SourceError::Upstream(_)));
    }

    #[tokio::test]
    async fn later_success_overrides_earlier_error() {
        let fanout = Fanout::builder()
            .source("a", "", Arc::new(Fixed(Err(SourceError::Upstream("boom".into())))), None)
            .source("b", "", Arc::new(Fixed(Ok(Some(b"ok".to_vec())))), None)
            .build();
        let result = fanout.fetch("key").await.unwrap();
        assert_eq!(result, b"ok");
    }
}
