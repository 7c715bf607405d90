//! Public-key discovery for the capability verifier: a set of Ed25519
//! verifying keys, supplied inline in config or polled from a URL every 5s
//! (response body is the base64url-encoded 32-byte key), published behind
//! an atomic pointer so readers never block on a refresh in flight.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::VerifyingKey;
use thiserror::Error;
use tracing::warn;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum KeyRegistryError {
    #[error("fetching public key from {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },
    #[error("decoding public key body: {0}")]
    BadEncoding(base64::DecodeError),
    #[error("public key is not 32 bytes")]
    WrongLength,
    #[error("malformed public key")]
    Invalid,
}

/// The live set of keys `auth::authorize` verifies capabilities against.
///
/// Cloning is cheap (an `Arc` bump); every clone observes the latest
/// refresh.
#[derive(Clone)]
pub struct KeyRegistry {
    current: Arc<ArcSwap<Vec<VerifyingKey>>>,
}

impl KeyRegistry {
    /// A fixed, never-refreshed set — used when config supplies keys inline.
    pub fn fixed(keys: Vec<VerifyingKey>) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(keys)),
        }
    }

    /// No keys configured: auth is disabled.
    pub fn disabled() -> Self {
        Self::fixed(Vec::new())
    }

    /// Fetch once and return the decoded key, without starting a refresher.
    pub async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<VerifyingKey, KeyRegistryError> {
        let body = client
            .get(url)
            .send()
            .await
            .map_err(|e| KeyRegistryError::Fetch { url: url.to_string(), source: e })?
            .bytes()
            .await
            .map_err(|e| KeyRegistryError::Fetch { url: url.to_string(), source: e })?;
        decode_key(&body)
    }

    /// Poll `url` every 5s, replacing the published key set on success and
    /// logging (without replacing) on failure.
    pub fn polled(client: reqwest::Client, url: String) -> Self {
        let registry = Self {
            current: Arc::new(ArcSwap::from_pointee(Vec::new())),
        };
        let handle = registry.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                match Self::fetch_once(&client, &url).await {
                    Ok(key) => handle.current.store(Arc::new(vec![key])),
                    Err(e) => warn!(url = %url, error = %e, "public key refresh failed, keeping previous set"),
                }
            }
        });

        registry
    }

    pub fn keys(&self) -> Arc<Vec<VerifyingKey>> {
        self.current.load_full()
    }
}

fn decode_key(body: &[u8]) -> Result<VerifyingKey, KeyRegistryError> {
    let trimmed: &[u8] = std::str::from_utf8(body)
        .map(|s| s.trim().as_bytes())
        .unwrap_or(body);
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(KeyRegistryError::BadEncoding)?;
    let array: [u8; 32] = bytes.try_into().map_err(|_| KeyRegistryError::WrongLength)?;
    VerifyingKey::from_bytes(&array).map_err(|_| KeyRegistryError::Invalid)
}
