//! Per-connection state: identity, lifecycle status, message log.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use filecast_protocol::close_code_name;

/// Lifecycle status of a connection.
///
/// Transitions are monotonic: `Connecting → Open | Failed`, `Open → Closed`.
/// `Failed` and `Closed` are terminal; a record never re-enters an earlier
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Failed,
    Closed,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Connecting => "Connecting",
            ConnectionStatus::Open => "Open",
            ConnectionStatus::Failed => "Failed",
            ConnectionStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State tracked for one connection.
///
/// Owned by the registry behind a per-record mutex; mutated only by the
/// worker runtime through the `on_*` methods, read by callers only as
/// clones. The message log is append-only and diagnostic.
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    id: u64,
    uri: String,
    status: ConnectionStatus,
    remote_server: String,
    error_reason: String,
    messages: Vec<String>,
}

pub(crate) type SharedRecord = Arc<Mutex<ConnectionRecord>>;

/// Locks a shared record, recovering from a poisoned mutex: a panic on the
/// worker must not take the diagnostic state down with it.
pub(crate) fn lock(record: &SharedRecord) -> MutexGuard<'_, ConnectionRecord> {
    record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ConnectionRecord {
    pub(crate) fn new(id: u64, uri: impl Into<String>) -> Self {
        Self {
            id,
            uri: uri.into(),
            status: ConnectionStatus::Connecting,
            remote_server: String::new(),
            error_reason: String::new(),
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn remote_server(&self) -> &str {
        &self.remote_server
    }

    pub fn error_reason(&self) -> &str {
        &self.error_reason
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Handshake completed; `server` is the response's `Server` header.
    pub(crate) fn on_open(&mut self, server: String) {
        if matches!(
            self.status,
            ConnectionStatus::Connecting | ConnectionStatus::Open
        ) {
            self.status = ConnectionStatus::Open;
            self.remote_server = server;
        }
    }

    /// Handshake failed. `server` is the `Server` header when the failure
    /// carried an HTTP response, otherwise empty.
    pub(crate) fn on_fail(&mut self, reason: String, server: String) {
        if matches!(
            self.status,
            ConnectionStatus::Connecting | ConnectionStatus::Failed
        ) {
            self.status = ConnectionStatus::Failed;
            self.remote_server = server;
            self.error_reason = reason;
        }
    }

    /// Connection closed by the peer (or torn down by the transport).
    pub(crate) fn on_close(&mut self, code: u16, reason: &str) {
        if matches!(self.status, ConnectionStatus::Open | ConnectionStatus::Closed) {
            self.status = ConnectionStatus::Closed;
            self.error_reason = format!(
                "close code: {code} ({}), close reason: {reason}",
                close_code_name(code)
            );
        }
    }

    /// Logs a received text frame verbatim.
    pub(crate) fn on_message_text(&mut self, text: &str) {
        self.messages.push(format!("<< {text}"));
    }

    /// Logs a received binary frame as hex.
    pub(crate) fn on_message_binary(&mut self, data: &[u8]) {
        self.messages.push(format!("<< {}", hex::encode(data)));
    }

    /// Logs a successfully submitted outbound message.
    pub(crate) fn record_sent(&mut self, description: &str) {
        self.messages.push(format!(">> {description}"));
    }
}

impl fmt::Display for ConnectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "> URI: {}", self.uri)?;
        writeln!(f, "> Status: {}", self.status)?;
        writeln!(
            f,
            "> Remote Server: {}",
            if self.remote_server.is_empty() {
                "None Specified"
            } else {
                &self.remote_server
            }
        )?;
        writeln!(
            f,
            "> Error/close reason: {}",
            if self.error_reason.is_empty() {
                "N/A"
            } else {
                &self.error_reason
            }
        )?;
        writeln!(f, "> Messages Processed: ({})", self.messages.len())?;
        for message in &self.messages {
            writeln!(f, "{message}")?;
        }
        Ok(())
    }
}
