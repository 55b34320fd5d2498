//! Error types for the connection registry.

use std::path::PathBuf;

use crate::record::ConnectionStatus;

/// Errors surfaced by registry operations.
///
/// Transport-level failures (handshake, close, remote errors) never appear
/// here; those are captured into the connection record's status and reason.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid WebSocket URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("no connection found with id {0}")]
    UnknownId(u64),

    #[error("connection {id} is {status}, not open")]
    NotOpen { id: u64, status: ConnectionStatus },

    #[error("failed to read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode message header: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("connection {0} is no longer accepting messages")]
    ChannelClosed(u64),

    #[error("failed to start worker runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
