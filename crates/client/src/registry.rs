//! Connection registry: owns the worker runtime and the id→record map.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::StreamExt;
use rustls::ClientConfig;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::http::Uri;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{Connector, tungstenite};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use filecast_protocol::{CLOSE_GOING_AWAY, MAX_MESSAGE_SIZE, TransferEnvelope, encode_frame};

use crate::error::RegistryError;
use crate::pumps::{read::read_pump, write::write_pump};
use crate::record::{ConnectionRecord, ConnectionStatus, SharedRecord, lock};

/// Depth of a connection's outbound queue. One in-flight transfer at a
/// time is the intended usage, so this only needs to absorb control
/// frames around it.
const WRITE_QUEUE_DEPTH: usize = 64;

/// Thread-safe handle used to submit frames to a connection's write pump.
#[derive(Clone)]
struct ConnectionHandle {
    tx: mpsc::Sender<tungstenite::Message>,
}

impl ConnectionHandle {
    /// Queues a message for the write pump. Must be called from outside
    /// the worker runtime (registry operations are synchronous).
    fn submit(&self, msg: tungstenite::Message) -> Result<(), ()> {
        self.tx.blocking_send(msg).map_err(|_| ())
    }
}

struct ConnectionEntry {
    record: SharedRecord,
    handle: ConnectionHandle,
}

/// Registry of WebSocket connections.
///
/// Owns a dedicated worker runtime that drives every handshake, TLS
/// verification callback, and message delivery; public operations are
/// synchronous and hand work to the worker through channels. Records are
/// exposed only as cloned snapshots.
pub struct ConnectionRegistry {
    runtime: tokio::runtime::Runtime,
    tls: Arc<ClientConfig>,
    connections: Mutex<HashMap<u64, ConnectionEntry>>,
    next_id: AtomicU64,
    cancel: CancellationToken,
}

impl ConnectionRegistry {
    /// Creates a registry with the given TLS client configuration and
    /// starts the worker runtime.
    pub fn new(tls: Arc<ClientConfig>) -> Result<Self, RegistryError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("filecast-ws")
            .enable_all()
            .build()
            .map_err(RegistryError::Runtime)?;

        Ok(Self {
            runtime,
            tls,
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        })
    }

    /// Opens a new connection to `uri` and returns its id immediately;
    /// the handshake completes asynchronously on the worker.
    ///
    /// URI validation happens before any state is created, so a rejected
    /// URI leaves nothing behind. Ids start at 0 and are never reused.
    pub fn connect(&self, uri: &str) -> Result<u64, RegistryError> {
        validate_uri(uri)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record: SharedRecord = Arc::new(Mutex::new(ConnectionRecord::new(id, uri)));
        let (write_tx, write_rx) = mpsc::channel(WRITE_QUEUE_DEPTH);

        self.lock_connections().insert(
            id,
            ConnectionEntry {
                record: record.clone(),
                handle: ConnectionHandle {
                    tx: write_tx.clone(),
                },
            },
        );

        self.runtime.spawn(run_connection(
            uri.to_owned(),
            self.tls.clone(),
            record,
            write_tx,
            write_rx,
            self.cancel.child_token(),
        ));

        info!(id, %uri, "connection scheduled");
        Ok(id)
    }

    /// Reads the file at `path` and transmits it as one binary message.
    ///
    /// Returns the number of bytes submitted to the transport. The record
    /// logs the message only after a successful submission. A missing or
    /// unreadable file is an explicit error; no envelope is built for it.
    pub fn send(&self, id: u64, path: &Path) -> Result<u64, RegistryError> {
        let Some((record, handle)) = self.entry(id) else {
            warn!(id, "no connection found");
            return Err(RegistryError::UnknownId(id));
        };

        let status = lock(&record).status();
        if status != ConnectionStatus::Open {
            warn!(id, %status, "send on a connection that is not open");
            return Err(RegistryError::NotOpen { id, status });
        }

        info!(id, path = %path.display(), "reading file for transfer");
        let payload = std::fs::read(path).map_err(|source| RegistryError::File {
            path: path.to_path_buf(),
            source,
        })?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let envelope = TransferEnvelope::new(request_id.clone(), payload).encode();

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let header = serde_json::json!({ "type": "fileTransfer", "file": file_name });
        let (frame, correlation_id) = encode_frame(&header, &envelope)?;
        let size = frame.len() as u64;

        handle
            .submit(tungstenite::Message::Binary(frame.into()))
            .map_err(|_| {
                warn!(id, "connection channel closed, send dropped");
                RegistryError::ChannelClosed(id)
            })?;

        lock(&record).record_sent(&format!(
            "{} ({size} bytes, request {request_id}, correlation {correlation_id})",
            path.display()
        ));
        info!(id, size, %correlation_id, "file submitted");
        Ok(size)
    }

    /// Initiates a close handshake with the given status code and reason.
    pub fn close(&self, id: u64, code: u16, reason: &str) -> Result<(), RegistryError> {
        let Some((_, handle)) = self.entry(id) else {
            warn!(id, "no connection found");
            return Err(RegistryError::UnknownId(id));
        };

        let frame = tungstenite::protocol::CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_owned().into(),
        };
        handle
            .submit(tungstenite::Message::Close(Some(frame)))
            .map_err(|_| {
                warn!(id, "error initiating close: connection channel closed");
                RegistryError::ChannelClosed(id)
            })?;

        info!(id, code, "close initiated");
        Ok(())
    }

    /// Returns a snapshot copy of a connection's record, never the live
    /// record.
    pub fn snapshot(&self, id: u64) -> Option<ConnectionRecord> {
        self.lock_connections()
            .get(&id)
            .map(|entry| lock(&entry.record).clone())
    }

    /// Known connection ids, ascending.
    pub fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.lock_connections().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Shuts the registry down: issues a going-away close for every open
    /// connection, then stops the worker runtime with a bounded join.
    pub fn shutdown(self) {
        let entries: Vec<(u64, ConnectionEntry)> = self.lock_connections().drain().collect();
        for (id, entry) in &entries {
            if lock(&entry.record).status() != ConnectionStatus::Open {
                continue;
            }
            info!(id, "closing connection");
            let frame = tungstenite::protocol::CloseFrame {
                code: CloseCode::from(CLOSE_GOING_AWAY),
                reason: "".to_owned().into(),
            };
            if entry
                .handle
                .submit(tungstenite::Message::Close(Some(frame)))
                .is_err()
            {
                warn!(id, "error closing connection: channel already closed");
            }
        }

        // The write pumps flush queued close frames after cancellation.
        self.cancel.cancel();
        self.runtime.shutdown_timeout(Duration::from_secs(2));
    }

    fn entry(&self, id: u64) -> Option<(SharedRecord, ConnectionHandle)> {
        self.lock_connections()
            .get(&id)
            .map(|entry| (entry.record.clone(), entry.handle.clone()))
    }

    fn lock_connections(&self) -> MutexGuard<'_, HashMap<u64, ConnectionEntry>> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Checks that a URI is something the transport can dial.
fn validate_uri(uri: &str) -> Result<(), RegistryError> {
    let parsed: Uri = uri.parse().map_err(|e| RegistryError::InvalidUri {
        uri: uri.to_owned(),
        reason: format!("{e}"),
    })?;

    match parsed.scheme_str() {
        Some("ws") | Some("wss") => {}
        other => {
            return Err(RegistryError::InvalidUri {
                uri: uri.to_owned(),
                reason: format!("unsupported scheme {:?}", other.unwrap_or("")),
            });
        }
    }
    if parsed.host().is_none() {
        return Err(RegistryError::InvalidUri {
            uri: uri.to_owned(),
            reason: "missing host".into(),
        });
    }
    Ok(())
}

/// Drives one connection on the worker runtime: handshake, then pumps.
async fn run_connection(
    uri: String,
    tls: Arc<ClientConfig>,
    record: SharedRecord,
    write_tx: mpsc::Sender<tungstenite::Message>,
    write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) {
    let mut ws_config = WebSocketConfig::default();
    ws_config.max_message_size = Some(MAX_MESSAGE_SIZE);
    ws_config.max_frame_size = Some(MAX_MESSAGE_SIZE);

    let connector = Connector::Rustls(tls);
    match tokio_tungstenite::connect_async_tls_with_config(
        uri.as_str(),
        Some(ws_config),
        false,
        Some(connector),
    )
    .await
    {
        Ok((stream, response)) => {
            let server = server_header(response.headers());
            info!(%uri, server = %server, "connection open");
            lock(&record).on_open(server);

            let (write, read) = stream.split();
            let write_task = tokio::spawn(write_pump(write, write_rx, cancel.clone()));
            read_pump(read, record, write_tx, cancel.clone()).await;

            // Reading is done; release the write pump and let it flush.
            cancel.cancel();
            let _ = write_task.await;
        }
        Err(e) => {
            let server = match &e {
                tungstenite::Error::Http(response) => server_header(response.headers()),
                _ => String::new(),
            };
            warn!(%uri, error = %e, "connection failed");
            lock(&record).on_fail(e.to_string(), server);
        }
    }
}

fn server_header(headers: &tokio_tungstenite::tungstenite::http::HeaderMap) -> String {
    headers
        .get("Server")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}
