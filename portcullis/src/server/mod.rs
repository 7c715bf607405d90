//! HTTP surface: a single catch-all route implementing the request handler
//! algorithm of §4.6 — verify, `Cache::get`, attach diagnostic headers,
//! respond.

mod mime;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::{error, warn};

use crate::auth;
use crate::cache::Cache;
use crate::source::KeyRegistry;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ServerState {
    pub cache: Arc<Cache>,
    pub keys: KeyRegistry,
    pub cors_origin: String,
    pub cache_control: String,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new().fallback(handle).with_state(state)
}

async fn handle(State(state): State<Arc<ServerState>>, method: Method, uri: Uri) -> Response {
    let mut headers = axum::http::HeaderMap::new();
    headers.insert("X-Robots-Tag", HeaderValue::from_static("noindex, nofollow"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("OPTIONS, GET"),
    );
    if let Ok(v) = HeaderValue::from_str(&state.cors_origin) {
        headers.insert("Access-Control-Allow-Origin", v);
    }
    if let Ok(v) = HeaderValue::from_str(&state.cache_control) {
        headers.insert(header::CACHE_CONTROL, v);
    }

    match method {
        Method::OPTIONS => return (StatusCode::NO_CONTENT, headers).into_response(),
        Method::GET => {}
        _ => return (StatusCode::METHOD_NOT_ALLOWED, headers).into_response(),
    }

    let keys = state.keys.keys();
    let object_key = match auth::authorize(uri.path(), &keys) {
        Ok(key) => key,
        Err(e) => return (StatusCode::UNAUTHORIZED, headers, e.to_string()).into_response(),
    };

    let result = match tokio::time::timeout(REQUEST_TIMEOUT, state.cache.get(&object_key)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(key = %object_key, error = %e, "cache populate failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, headers, e.to_string()).into_response();
        }
        Err(_) => {
            warn!(key = %object_key, "request timed out");
            return (StatusCode::INTERNAL_SERVER_ERROR, headers, "request timed out").into_response();
        }
    };

    if let Ok(v) = HeaderValue::from_str(&result.header()) {
        headers.insert("X-Cache", v);
    }

    if result.value.is_empty() {
        return (StatusCode::NOT_FOUND, headers).into_response();
    }

    if let Some(mime_type) = mime::lookup(&object_key) {
        if let Ok(v) = HeaderValue::from_str(&mime_type) {
            headers.insert(header::CONTENT_TYPE, v);
        }
    }

    (StatusCode::OK, headers, result.value).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BoxFuture, CacheError, OnMissing, Store};
    use ed25519_dalek::{SigningKey, VerifyingKey};
    use http_body_util::BodyExt;
    use rand::{rngs::OsRng, RngCore};
    use tower::ServiceExt;

    struct FixedOnMissing(Vec<u8>);
    impl OnMissing for FixedOnMissing {
        fn fetch<'a>(&'a self, _key: &'a str) -> BoxFuture<'a, Result<Vec<u8>, CacheError>> {
            let v = self.0.clone();
            Box::pin(async move { Ok(v) })
        }
    }

    fn keypair() -> (SigningKey, VerifyingKey) {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        let signing = SigningKey::from_bytes(&seed);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    fn state_with(keys: KeyRegistry, body: &'static [u8]) -> Arc<ServerState> {
        let store = Store::open(tempfile::tempdir().unwrap().into_path()).unwrap();
        let cache = Cache::new(store, 10_000, Arc::new(FixedOnMissing(body.to_vec())));
        Arc::new(ServerState {
            cache: Arc::new(cache),
            keys,
            cors_origin: "*".to_string(),
            cache_control: "public, max-age=60".to_string(),
        })
    }

    #[tokio::test]
    async fn options_request_returns_no_content() {
        let app = router(state_with(KeyRegistry::disabled(), b"x"));
        let request = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/anything")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn unsupported_method_is_405() {
        let app = router(state_with(KeyRegistry::disabled(), b"x"));
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/anything")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn no_auth_mode_serves_object_with_mime_and_cache_headers() {
        let app = router(state_with(KeyRegistry::disabled(), b"hello"));
        let request = axum::http::Request::builder()
            .method(Method::GET)
            .uri("/a/b/c.json")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert!(response.headers().contains_key("X-Cache"));
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn authenticated_mode_rejects_missing_capability() {
        let (_sk, pk) = keypair();
        let app = router(state_with(KeyRegistry::fixed(vec![pk]), b"hello"));
        let request = axum::http::Request::builder()
            .method(Method::GET)
            .uri("/a/b/c.json")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authenticated_mode_accepts_valid_capability() {
        let (sk, pk) = keypair();
        let deadline = chrono::Utc::now().timestamp() + 60;
        let token = auth::generate_capability("dir", deadline, &sk);
        let app = router(state_with(KeyRegistry::fixed(vec![pk]), b"hello"));
        let uri = format!("/{token}/file.ext");
        let request = axum::http::Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn clean_miss_is_404() {
        let app = router(state_with(KeyRegistry::disabled(), b""));
        let request = axum::http::Request::builder()
            .method(Method::GET)
            .uri("/a/b/c.json")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
