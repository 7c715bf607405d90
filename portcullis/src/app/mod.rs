//! Application bootstrap and lifecycle: load configuration, wire the cache,
//! the upstream fan-out, and the public key registry, then serve.

mod bootstrap;
mod error;

pub use bootstrap::PortcullisApp;
pub use error::GatewayError;
