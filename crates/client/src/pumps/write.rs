//! WebSocket write pump — drains the connection handle's channel.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Writes queued messages to the WebSocket.
///
/// Stops when the channel closes, a close frame is sent, or the token is
/// cancelled. On cancellation any already-queued messages (a going-away
/// close, typically) are flushed before the final close frame.
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let mut sent_close = false;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            msg = write_rx.recv() => {
                match msg {
                    Some(m) => {
                        let is_close = matches!(m, tungstenite::Message::Close(_));
                        if let Err(e) = write.send(m).await {
                            error!("WebSocket write error: {e}");
                            return;
                        }
                        if is_close {
                            sent_close = true;
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Flush whatever was queued before the pump stopped.
    while let Ok(m) = write_rx.try_recv() {
        let is_close = matches!(m, tungstenite::Message::Close(_));
        if write.send(m).await.is_err() {
            return;
        }
        if is_close {
            sent_close = true;
            break;
        }
    }

    if !sent_close {
        let _ = write.send(tungstenite::Message::Close(None)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::sink;

    fn capture_sink(
        tx: mpsc::Sender<tungstenite::Message>,
    ) -> impl SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin {
        Box::pin(sink::unfold(tx, |tx, msg: tungstenite::Message| async move {
            let _ = tx.send(msg).await;
            Ok::<_, tungstenite::Error>(tx)
        }))
    }

    #[tokio::test]
    async fn sends_close_frame_on_cancel() {
        let (sink_tx, mut sink_rx) = mpsc::channel(16);
        let (_write_tx, write_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let c = cancel.clone();
        let handle = tokio::spawn(write_pump(capture_sink(sink_tx), write_rx, c));

        cancel.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .expect("pump should stop")
            .expect("no panic");

        let msg = sink_rx.recv().await;
        assert!(matches!(msg, Some(tungstenite::Message::Close(None))));
    }

    #[tokio::test]
    async fn flushes_queued_close_after_cancel() {
        let (sink_tx, mut sink_rx) = mpsc::channel(16);
        let (write_tx, write_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        // Queue a going-away close, then cancel before the pump starts.
        let frame = tungstenite::protocol::CloseFrame {
            code: tungstenite::protocol::frame::coding::CloseCode::from(1001u16),
            reason: "shutdown".into(),
        };
        write_tx
            .send(tungstenite::Message::Close(Some(frame)))
            .await
            .unwrap();
        cancel.cancel();

        write_pump(capture_sink(sink_tx), write_rx, cancel).await;

        let msg = sink_rx.recv().await.unwrap();
        match msg {
            tungstenite::Message::Close(Some(f)) => {
                assert_eq!(u16::from(f.code), 1001);
                assert_eq!(f.reason.as_str(), "shutdown");
            }
            other => panic!("expected queued close frame, got {other:?}"),
        }
        // No duplicate close after the explicit one.
        assert!(sink_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn forwards_messages_in_order() {
        let (sink_tx, mut sink_rx) = mpsc::channel(16);
        let (write_tx, write_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let pump = tokio::spawn(write_pump(capture_sink(sink_tx), write_rx, cancel));

        write_tx
            .send(tungstenite::Message::Binary(vec![1u8, 2].into()))
            .await
            .unwrap();
        write_tx
            .send(tungstenite::Message::Text("after".into()))
            .await
            .unwrap();
        drop(write_tx);

        pump.await.unwrap();

        assert!(matches!(
            sink_rx.recv().await,
            Some(tungstenite::Message::Binary(_))
        ));
        assert!(matches!(
            sink_rx.recv().await,
            Some(tungstenite::Message::Text(_))
        ));
    }
}
