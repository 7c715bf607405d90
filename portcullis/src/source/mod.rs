//! Upstream object fan-out: S3-compatible buckets and FTP servers behind a
//! single `ObjectFetcher` capability, tried in declared order.

mod fanout;
mod ftp;
mod keys;
mod s3;

pub use fanout::Fanout;
pub use ftp::FtpSource;
pub use keys::{KeyRegistry, KeyRegistryError};
pub use s3::S3Source;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("content length mismatch: declared {declared}, read {actual}")]
    LengthMismatch { declared: u64, actual: u64 },

    #[error("request cancelled")]
    Cancelled,
}

/// One configured upstream. `fetch` returns `Ok(None)` for a clean
/// "no such key" (the fan-out moves on to the next source); any other
/// failure is `Err` and is remembered as the fan-out's `last` error.
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, SourceError>;
}
