//! Persistent key → bytes map backed by `sled`, wiped on open.
//!
//! Cache contents never survive a restart: `Store::open` clears any prior
//! database at the given directory before use, and `Store::close` removes the
//! directory entirely. No ordering or iteration beyond that cleanup is relied
//! upon elsewhere in the crate.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store engine error: {0}")]
    Engine(#[from] sled::Error),
}

/// A disk-backed key/value store scoped to one cache instance's lifetime.
pub struct Store {
    db: sled::Db,
    dir: PathBuf,
}

impl Store {
    /// Open (or create) the store at `dir`, wiping any existing contents.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        std::fs::create_dir_all(&dir)?;
        let db = sled::open(&dir)?;
        Ok(Self { db, dir })
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key.as_bytes())?.map(|ivec| ivec.to_vec()))
    }

    pub fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key.as_bytes(), value)?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.db.remove(key.as_bytes())?;
        Ok(())
    }

    /// Drop the underlying engine handle and erase the store's directory.
    pub fn close(self) -> Result<(), StoreError> {
        let dir = self.dir.clone();
        drop(self.db);
        if dir.exists() {
            std::fs::remove_dir_all(&dir)?;
        }
        Ok(())
    }
}
