//! Portcullis - a read-only HTTPS gateway over signed-URL capabilities.
//!
//! Requests are authorized by a path-embedded Ed25519 capability (`auth`),
//! resolved to an object key, and served out of a size-bounded LRU cache
//! (`cache`) that populates on demand from one or more upstream object
//! stores (`source`).

pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod server;
pub mod source;
pub mod telemetry;
