//! Top-level error type unifying every subsystem's failures for the
//! bootstrap path and the process-level error surface.

use thiserror::Error;

use crate::auth::AuthError;
use crate::cache::{CacheError, StoreError};
use crate::config::ConfigError;
use crate::source::{KeyRegistryError, SourceError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("upstream source error: {0}")]
    Source(#[from] SourceError),

    #[error("public key registry error: {0}")]
    KeyRegistry(#[from] KeyRegistryError),

    #[error("invalid public key {0:?}: not a valid base64url-encoded Ed25519 key")]
    InvalidPublicKey(String),

    #[error("binding server address {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },

    #[error("TLS configuration error: {0}")]
    Tls(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_wraps_with_context() {
        let err: GatewayError = ConfigError::NoSources.into();
        assert!(err.to_string().contains("configuration error"));
    }
}
