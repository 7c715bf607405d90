//! FTP upstream, backed by `suppaftp`'s blocking client behind a small
//! connection pool. `suppaftp` has no async client, so every call to the
//! wire happens inside `spawn_blocking`.

use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use suppaftp::{FtpError, FtpStream};
use tracing::debug;

use super::{ObjectFetcher, SourceError};

const DIAL_TIMEOUT: Duration = Duration::from_secs(3);

struct Dialer {
    host: String,
    user: String,
    pass: String,
    root: String,
}

impl Dialer {
    fn dial(&self) -> Result<FtpStream, FtpError> {
        let addr = self
            .host
            .to_socket_addrs()
            .map_err(|e| FtpError::ConnectionError(std::io::Error::new(std::io::ErrorKind::Other, e)))?
            .next()
            .ok_or_else(|| {
                FtpError::ConnectionError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no address resolved",
                ))
            })?;
        let mut stream = FtpStream::connect_timeout(addr, DIAL_TIMEOUT)?;
        stream.login(&self.user, &self.pass)?;
        if !self.root.is_empty() {
            stream.cwd(&self.root)?;
        }
        Ok(stream)
    }
}

/// A small pool of live FTP control connections, checked for liveness with
/// `NOOP` before reuse and redialed on the spot if dead — mirroring the
/// original's `sync.Pool`-of-connections design, adapted to an explicit
/// `Mutex<Vec<_>>` since `suppaftp` is not `Clone`.
pub struct FtpSource {
    dialer: Arc<Dialer>,
    idle: Arc<Mutex<Vec<FtpStream>>>,
}

impl FtpSource {
    pub fn new(host: impl Into<String>, user: impl Into<String>, pass: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            dialer: Arc::new(Dialer {
                host: host.into(),
                user: user.into(),
                pass: pass.into(),
                root: root.into(),
            }),
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn checkout(&self) -> Result<FtpStream, FtpError> {
        loop {
            let candidate = self.idle.lock().pop();
            match candidate {
                Some(mut conn) => {
                    if conn.noop().is_ok() {
                        return Ok(conn);
                    }
                    // dead connection, drop it and try the next idle one
                }
                None => return self.dialer.dial(),
            }
        }
    }

    fn checkin(&self, conn: FtpStream) {
        self.idle.lock().push(conn);
    }
}

fn is_not_found(err: &FtpError) -> bool {
    matches!(err, FtpError::UnexpectedResponse(r) if r.status.code() == 550)
}

#[async_trait]
impl ObjectFetcher for FtpSource {
    async fn fetch(&self, key: &str) -> Result<Option<Vec<u8>>, SourceError> {
        let dialer = Arc::clone(&self.dialer);
        let idle = Arc::clone(&self.idle);
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let pool = FtpSource { dialer, idle };
            let mut conn = match pool.checkout() {
                Ok(c) => c,
                Err(e) => return Err(SourceError::Upstream(e.to_string())),
            };

            let declared = match conn.size(&key) {
                Ok(n) => Some(n as u64),
                Err(e) if is_not_found(&e) => {
                    pool.checkin(conn);
                    return Ok(None);
                }
                Err(_) => None,
            };

            let result = conn.retr_as_buffer(&key);
            match result {
                Ok(cursor) => {
                    let bytes = cursor.into_inner();
                    if let Some(declared) = declared {
                        if bytes.len() as u64 != declared {
                            pool.checkin(conn);
                            return Err(SourceError::LengthMismatch {
                                declared,
                                actual: bytes.len() as u64,
                            });
                        }
                    }
                    pool.checkin(conn);
                    Ok(Some(bytes))
                }
                Err(e) if is_not_found(&e) => {
                    pool.checkin(conn);
                    Ok(None)
                }
                Err(e) => {
                    debug!(error = %e, key = %key, "ftp retrieve failed");
                    Err(SourceError::Upstream(e.to_string()))
                }
            }
        })
        .await
        .map_err(|e| SourceError::Upstream(format!("ftp worker panicked: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_matcher_requires_550() {
        use suppaftp::{Response, Status};
        let not_found = FtpError::UnexpectedResponse(Response::new(Status::FileUnavailable, Vec::new()));
        assert!(is_not_found(&not_found));

        let other = FtpError::UnexpectedResponse(Response::new(Status::ActionNotTaken, Vec::new()));
        assert!(!is_not_found(&other));
    }
}
