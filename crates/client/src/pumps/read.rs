//! WebSocket read pump — delivers transport events into the record.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::record::{SharedRecord, lock};

/// Close code reported when no status was received from the peer.
const CLOSE_NO_STATUS: u16 = 1005;

/// Close code reported when the stream died without a close handshake.
const CLOSE_ABNORMAL: u16 = 1006;

/// Reads messages from the WebSocket until close, error, or cancellation.
///
/// Events for the connection arrive here in transport order, so the
/// record's message log order equals delivery order.
pub(crate) async fn read_pump<S>(
    mut read: S,
    record: SharedRecord,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = read.next() => {
                match msg {
                    Some(Ok(msg)) => match msg {
                        tungstenite::Message::Text(text) => {
                            trace!(bytes = text.len(), "received text frame");
                            lock(&record).on_message_text(&text);
                        }
                        tungstenite::Message::Binary(data) => {
                            trace!(bytes = data.len(), "received binary frame");
                            lock(&record).on_message_binary(&data);
                        }
                        tungstenite::Message::Ping(data) => {
                            let _ = write_tx.send(tungstenite::Message::Pong(data)).await;
                        }
                        tungstenite::Message::Pong(_) => {}
                        tungstenite::Message::Close(frame) => {
                            let (code, reason) = match frame {
                                Some(f) => (u16::from(f.code), f.reason.to_string()),
                                None => (CLOSE_NO_STATUS, String::new()),
                            };
                            debug!(code, %reason, "received close frame");
                            lock(&record).on_close(code, &reason);
                            break;
                        }
                        _ => {} // Raw frames — not surfaced by tokio-tungstenite reads.
                    },
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {e}");
                        lock(&record).on_close(CLOSE_ABNORMAL, &format!("transport error: {e}"));
                        break;
                    }
                    None => {
                        debug!("WebSocket stream ended");
                        lock(&record).on_close(CLOSE_ABNORMAL, "stream ended");
                        break;
                    }
                }
            }
        }
    }
}
