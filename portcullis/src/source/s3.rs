//! S3-compatible upstream, backed by `object_store`.

use async_trait::async_trait;
use object_store::aws::AmazonS3;
use object_store::path::Path as ObjectPath;
use object_store::{Error as ObjectStoreError, ObjectStore};

use super::{ObjectFetcher, SourceError};

/// One configured S3-compatible bucket. Construction (endpoint, region,
/// credentials) happens at the call site via `AmazonS3Builder`; this type
/// only adapts the resulting client to `ObjectFetcher`.
pub struct S3Source {
    store: AmazonS3,
    bucket: String,
}

impl S3Source {
    pub fn new(store: AmazonS3, bucket: impl Into<String>) -> Self {
        Self { store, bucket: bucket.into() }
    }
}

#[async_trait]
impl ObjectFetcher for S3Source {
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, SourceError> {
        let path = ObjectPath::from(key.trim_start_matches('/'));
        let get_result = match self.store.get(&path).await {
            Ok(r) => r,
            Err(ObjectStoreError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(SourceError::Upstream(format!("{}: {e}", self.bucket))),
        };

        let declared = get_result.meta.size as u64;
        let bytes = get_result
            .bytes()
            .await
            .map_err(|e| SourceError::Upstream(format!("{}: {e}", self.bucket)))?;

        if bytes.len() as u64 != declared {
            return Err(SourceError::LengthMismatch {
                declared,
                actual: bytes.len() as u64,
            });
        }

        Ok(Some(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectPath;

    // `InMemory` implements `ObjectStore` the same way `AmazonS3` does, so it
    // exercises the adapter logic (not-found mapping, length check) without
    // needing real S3 credentials. The adapter is re-assembled here against
    // the trait rather than `S3Source` directly, since `S3Source` is pinned
    // to the concrete `AmazonS3` type.
    async fn fetch_via(store: &impl ObjectStore, key: &str) -> Result<Option<Vec<u8>>, SourceError> {
        let path = ObjectPath::from(key.trim_start_matches('/'));
        match store.get(&path).await {
            Ok(r) => {
                let declared = r.meta.size as u64;
                let bytes = r.bytes().await.unwrap();
                if bytes.len() as u64 != declared {
                    return Err(SourceError::LengthMismatch { declared, actual: bytes.len() as u64 });
                }
                Ok(Some(bytes.to_vec()))
            }
            Err(ObjectStoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(SourceError::Upstream(e.to_string())),
        }
    }

    #[tokio::test]
    async fn missing_key_is_clean_none() {
        let store = InMemory::new();
        let result = fetch_via(&store, "no/such/key.ext").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn present_key_round_trips() {
        let store = InMemory::new();
        let path = ObjectPath::from("dir/file.ext");
        store.put(&path, bytes::Bytes::from_static(b"hello").into()).await.unwrap();
        let result = fetch_via(&store, "dir/file.ext").await.unwrap();
        assert_eq!(result, Some(b"hello".to_vec()));
    }
}
