//! Connection registry for encrypted WebSocket file transfers.
//!
//! [`ConnectionRegistry`] owns a dedicated worker runtime and the set of
//! per-connection records. The front end stays synchronous: operations
//! hand work to the worker through channels and read state back only as
//! cloned snapshots, so no live record ever crosses the thread boundary.

mod error;
mod pumps;
pub mod record;
pub mod registry;

pub use error::RegistryError;
pub use record::{ConnectionRecord, ConnectionStatus};
pub use registry::ConnectionRegistry;
