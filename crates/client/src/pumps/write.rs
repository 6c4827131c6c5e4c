//! WebSocket write pump: serialises outbound messages and keeps the
//! connection alive with periodic pings.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at};
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::error;

use roomcast_protocol::Frame;
use roomcast_protocol::constants::WS_PING_PERIOD;
use roomcast_transfer::{FrameSink, TransferError};

use crate::error::ClientError;

/// Handle for queueing frames onto the write pump.
///
/// The queue is unbounded so a whole transfer can be emitted without
/// awaiting; ordering between frames is preserved.
#[derive(Debug, Clone)]
pub(crate) struct FrameWriter {
    tx: mpsc::UnboundedSender<tungstenite::Message>,
}

impl FrameWriter {
    pub(crate) fn new(tx: mpsc::UnboundedSender<tungstenite::Message>) -> Self {
        Self { tx }
    }

    pub(crate) fn send(&self, frame: &Frame) -> Result<(), ClientError> {
        let json = frame.encode()?;
        self.tx
            .send(tungstenite::Message::Text(json.into()))
            .map_err(|_| ClientError::Closed)
    }
}

impl FrameSink for FrameWriter {
    fn send_frame(&mut self, frame: Frame) -> Result<(), TransferError> {
        let json = frame
            .encode()
            .map_err(|e| TransferError::Encode(e.to_string()))?;
        self.tx
            .send(tungstenite::Message::Text(json.into()))
            .map_err(|_| TransferError::Closed)
    }
}

/// Writes queued messages to the WebSocket, interleaving a ping every
/// [`WS_PING_PERIOD`].
pub(crate) async fn write_pump<S>(
    mut write: S,
    mut write_rx: mpsc::UnboundedReceiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    let mut keepalive = interval_at(Instant::now() + WS_PING_PERIOD, WS_PING_PERIOD);

    loop {
        let msg = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = keepalive.tick() => tungstenite::Message::Ping(Vec::new().into()),
            msg = write_rx.recv() => match msg {
                Some(m) => m,
                None => break,
            },
        };
        if let Err(e) = write.send(msg).await {
            error!("WebSocket write error: {e}");
            break;
        }
    }

    let _ = write.send(tungstenite::Message::Close(None)).await;
}
