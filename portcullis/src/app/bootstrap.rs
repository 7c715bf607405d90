//! Wires configuration into a running gateway: cache, upstream fan-out,
//! public key registry, and the HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::VerifyingKey;
use object_store::aws::AmazonS3Builder;
use tracing::info;

use super::error::GatewayError;
use crate::cache::{Cache, Store};
use crate::config::{GatewayConfig, SourceConfig};
use crate::server::{self, ServerState};
use crate::source::{Fanout, FtpSource, KeyRegistry, S3Source};

/// A fully wired gateway, ready to serve.
pub struct PortcullisApp {
    config: GatewayConfig,
    state: Arc<ServerState>,
}

impl PortcullisApp {
    pub fn bootstrap(config: GatewayConfig) -> Result<Self, GatewayError> {
        if config.public_keys.is_empty() {
            info!("no public keys configured, serving in no-auth mode");
        }
        if config.cache.size == 0 {
            info!("cache size is 0, gateway will pass through to upstream on every request");
        }

        let keys = build_key_registry(&config.public_keys)?;
        let fanout = build_fanout(&config.sources)?;

        let store = Store::open(config.cache.dir.clone())?;
        let cache = Cache::new(store, config.cache.max_bytes(), Arc::new(fanout));

        let state = Arc::new(ServerState {
            cache: Arc::new(cache),
            keys,
            cors_origin: config.server.headers.cors.clone(),
            cache_control: config.server.headers.cache.clone(),
        });

        Ok(Self { config, state })
    }

    /// Start serving. Blocks until the server exits (normally on shutdown
    /// signal, or when the address fails to bind).
    pub async fn serve(self) -> Result<(), GatewayError> {
        let addr: SocketAddr = self
            .config
            .server
            .addr
            .parse()
            .map_err(|_| GatewayError::Bind {
                addr: self.config.server.addr.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a socket address"),
            })?;

        let app = server::router(self.state);

        if let Some(tls) = &self.config.server.tls {
            if let (Some(key), Some(cert)) = (&tls.key, &tls.cert) {
                let rustls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                    .await
                    .map_err(|e| GatewayError::Tls(e.to_string()))?;
                info!(%addr, "listening (TLS)");
                axum_server::bind_rustls(addr, rustls_config)
                    .serve(app.into_make_service())
                    .await
                    .map_err(|e| GatewayError::Bind { addr: addr.to_string(), source: e })?;
                return Ok(());
            }
            if tls.acme.is_some() {
                return Err(GatewayError::Tls(
                    "ACME certificate management is not wired in this build".to_string(),
                ));
            }
        }

        info!(%addr, "listening");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind { addr: addr.to_string(), source: e })?;
        axum::serve(listener, app)
            .await
            .map_err(|e| GatewayError::Bind { addr: addr.to_string(), source: e })?;
        Ok(())
    }
}

fn build_key_registry(public_keys: &[String]) -> Result<KeyRegistry, GatewayError> {
    if public_keys.is_empty() {
        return Ok(KeyRegistry::disabled());
    }

    // A single entry that looks like a URL is treated as a polling endpoint;
    // otherwise every entry is an inline base64url-encoded key.
    if public_keys.len() == 1 && looks_like_url(&public_keys[0]) {
        let client = reqwest::Client::new();
        return Ok(KeyRegistry::polled(client, public_keys[0].clone()));
    }

    let mut decoded = Vec::with_capacity(public_keys.len());
    for raw in public_keys {
        decoded.push(decode_inline_key(raw)?);
    }
    Ok(KeyRegistry::fixed(decoded))
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn decode_inline_key(raw: &str) -> Result<VerifyingKey, GatewayError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(raw.trim())
        .map_err(|_| GatewayError::InvalidPublicKey(raw.to_string()))?;
    let array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| GatewayError::InvalidPublicKey(raw.to_string()))?;
    VerifyingKey::from_bytes(&array).map_err(|_| GatewayError::InvalidPublicKey(raw.to_string()))
}

fn build_fanout(sources: &indexmap::IndexMap<String, SourceConfig>) -> Result<Fanout, GatewayError> {
    let mut builder = Fanout::builder();
    for (name, source) in sources {
        let timeout = source.timeout.map(Duration::from_secs);
        if let Some(bucket) = &source.bucket {
            let s3 = AmazonS3Builder::new()
                .with_endpoint(&source.host)
                .with_bucket_name(bucket)
                .with_access_key_id(&source.id)
                .with_secret_access_key(&source.key)
                .with_allow_http(true)
                .build()
                .map_err(|e| GatewayError::Source(crate::source::SourceError::Upstream(e.to_string())))?;
            builder = builder.source(name.as_str(), source.root.as_str(), Arc::new(S3Source::new(s3, bucket.as_str())), timeout);
        } else {
            let ftp = FtpSource::new(source.host.as_str(), source.id.as_str(), source.key.as_str(), source.root.as_str());
            builder = builder.source(name.as_str(), "", Arc::new(ftp), timeout);
        }
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_detection_selects_polling_mode() {
        assert!(looks_like_url("https://keys.example.com/current"));
        assert!(!looks_like_url("d2hhdGV2ZXI"));
    }

    #[test]
    fn inline_key_round_trips() {
        let mut seed = [7u8; 32];
        seed[0] = 1;
        let signing = ed25519_dalek::SigningKey::from_bytes(&seed);
        let encoded = URL_SAFE_NO_PAD.encode(signing.verifying_key().to_bytes());
        let decoded = decode_inline_key(&encoded).unwrap();
        assert_eq!(decoded, signing.verifying_key());
    }

    #[test]
    fn malformed_inline_key_is_rejected() {
        let err = decode_inline_key("not-valid-base64!!").unwrap_err();
        assert!(matches!(err, GatewayError::InvalidPublicKey(_)));
    }
}
