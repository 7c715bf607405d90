//! Signed-path admission protocol: a stateless Ed25519 capability embedded in
//! the URL, granting access to a directory subtree until a deadline.
//!
//! Wire format: `<sig>/<unixSec>/<dir...>/<file>`, where `sig` is the
//! unpadded base64url Ed25519 signature over `<unixSec>/<dir...>`. See
//! `authorize` for verification and `generate_capability` for issuing one.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no signature")]
    Unauthorized,
    #[error("bad signature encoding")]
    BadEncoding,
    #[error("malformed token: {0}")]
    Malformed(&'static str),
    #[error("past timestamp")]
    PastTimestamp,
    #[error("invalid path")]
    InvalidPath,
    #[error("auth failed: {0}")]
    Failed(String),
}

/// Verify a request path against the configured public keys and return the
/// residual object key on success.
///
/// With no configured keys, auth is disabled: the path itself (after
/// validation) is the object key.
pub fn authorize(url_path: &str, public_keys: &[VerifyingKey]) -> Result<String, AuthError> {
    if public_keys.is_empty() {
        if !validate_object_key(url_path) {
            return Err(AuthError::InvalidPath);
        }
        return Ok(url_path.to_string());
    }

    let trimmed = url_path.trim_matches('/');
    let mut last_err = AuthError::Unauthorized;

    for key in public_keys {
        let Some((head, _tail)) = trimmed.rsplit_once('/') else {
            last_err = AuthError::Malformed("path has no directory component");
            continue;
        };
        match verify_head(head, key) {
            Ok(()) => {
                let residual = split_off_first_two(trimmed);
                let object_key = format!("/{residual}");
                return if validate_object_key(&object_key) {
                    Ok(object_key)
                } else {
                    Err(AuthError::InvalidPath)
                };
            }
            Err(e) => last_err = e,
        }
    }

    Err(AuthError::Failed(last_err.to_string()))
}

/// Verify `head` (`sig/deadline/dir...`) against one candidate key.
fn verify_head(head: &str, public_key: &VerifyingKey) -> Result<(), AuthError> {
    let (sig_b64, token) = head
        .split_once('/')
        .ok_or(AuthError::Malformed("missing signature segment"))?;

    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| AuthError::BadEncoding)?;
    let signature =
        Signature::from_slice(&sig_bytes).map_err(|_| AuthError::BadEncoding)?;

    let (deadline_str, _dir) = token
        .split_once('/')
        .ok_or(AuthError::Malformed("missing timestamp segment"))?;
    let deadline: i64 = deadline_str
        .parse()
        .map_err(|_| AuthError::Malformed("timestamp is not an integer"))?;
    if deadline < 0 || deadline < now() {
        return Err(AuthError::PastTimestamp);
    }

    public_key
        .verify(token.as_bytes(), &signature)
        .map_err(|_| AuthError::Unauthorized)
}

/// `path` with its first two `/`-separated segments (`sig`, `deadline`)
/// removed, keeping everything else — including extra slashes — intact.
fn split_off_first_two(path: &str) -> &str {
    let mut parts = path.splitn(3, '/');
    parts.next();
    parts.next();
    parts.next().unwrap_or("")
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Issue a capability token for interoperability with the signing party.
/// Not used by the gateway itself — the gateway only verifies.
pub fn generate_capability(dir: &str, deadline_unix: i64, signing_key: &SigningKey) -> String {
    let dir = dir.strip_prefix('/').unwrap_or(dir);
    let token = format!("{deadline_unix}/{dir}");
    let signature = signing_key.sign(token.as_bytes());
    format!("{}/{token}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

/// Object key constraints from the data model: non-empty UTF-8, `<= 255`
/// bytes, no `//`, `./`, `/.`, backslash, or colon, a non-empty extension,
/// and not equal to `/`.
pub fn validate_object_key(key: &str) -> bool {
    if key.is_empty() || key.len() > 255 || key == "/" {
        return false;
    }
    if key.contains("//") || key.contains("./") || key.contains("/.") {
        return false;
    }
    if key.contains('\\') || key.contains(':') {
        return false;
    }
    extension(key).is_some()
}

fn extension(key: &str) -> Option<&str> {
    let file = key.rsplit('/').next().unwrap_or(key);
    let dot = file.rfind('.')?;
    if dot == 0 || dot == file.len() - 1 {
        return None;
    }
    Some(&file[dot + 1..])
}
