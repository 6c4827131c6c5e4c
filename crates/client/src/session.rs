//! Per-connection session: the one place inbound frames are processed.
//!
//! All transfer state for a connection lives in a [`Session`], driven by
//! a single task so that no two frames are ever handled concurrently.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use roomcast_protocol::{AudioAck, Frame};
use roomcast_transfer::{
    AckLedger, AckOutcome, FrameSink, SentTransfer, TransferError, TransferEvent,
    TransferReceiver, TransferSender,
};

use crate::error::ClientError;
use crate::pumps::write::FrameWriter;
use crate::types::{ClientEvent, SessionOptions};

/// Transfer state of one connection: the receiver, the sender and the
/// ledger of acks for payloads this client emitted.
#[derive(Debug)]
pub struct Session {
    receiver: TransferReceiver,
    sender: TransferSender,
    ledger: AckLedger,
}

impl Session {
    pub fn new(identity: &str, options: &SessionOptions) -> Self {
        Self {
            receiver: TransferReceiver::new(identity),
            sender: TransferSender::new(identity)
                .with_chunk_size(options.chunk_size)
                .with_max_payload(options.max_payload),
            ledger: AckLedger::new(),
        }
    }

    pub fn identity(&self) -> &str {
        self.receiver.identity()
    }

    /// Processes one inbound frame. Acks for received chunks go to `sink`.
    pub fn handle_frame(&mut self, frame: Frame, sink: &mut dyn FrameSink) -> Option<ClientEvent> {
        match frame {
            Frame::AudioAck(ack) => self.on_ack(&ack),
            Frame::Unknown => {
                debug!("dropping frame of unknown type");
                None
            }
            frame if frame.is_transfer() => self
                .receiver
                .handle(&frame, sink)
                .map(ClientEvent::Transfer),
            other => Some(ClientEvent::Chat(other)),
        }
    }

    /// Emits `payload` as a chunked transfer and starts counting its acks.
    pub fn send_payload(
        &mut self,
        sink: &mut dyn FrameSink,
        room: &str,
        payload_name: &str,
        payload_kind: &str,
        payload: &[u8],
    ) -> Result<SentTransfer, TransferError> {
        let sent = self
            .sender
            .send_payload(sink, room, payload_name, payload_kind, payload)?;
        self.ledger.track(&sent.transfer_id, sent.total_chunks);
        Ok(sent)
    }

    /// Tears down after the connection closed.
    ///
    /// Returns one `Abandoned` event per active inbound transfer followed
    /// by `Disconnected`.
    pub fn close(&mut self) -> Vec<ClientEvent> {
        for id in self.ledger.pending().map(str::to_string).collect::<Vec<_>>() {
            if let Some(unacked) = self.ledger.forget(&id) {
                debug!(transfer_id = %id, unacked = unacked.len(), "closing with unacknowledged chunks");
            }
        }
        let mut events: Vec<ClientEvent> = self
            .receiver
            .abandon_all()
            .into_iter()
            .map(ClientEvent::Transfer)
            .collect();
        events.push(ClientEvent::Disconnected);
        events
    }

    fn on_ack(&mut self, ack: &AudioAck) -> Option<ClientEvent> {
        match self.ledger.record(&ack.transfer_id, ack.seq) {
            Ok(AckOutcome::New { acked, total }) => Some(ClientEvent::AckProgress {
                transfer_id: ack.transfer_id.clone(),
                acked,
                total,
            }),
            Ok(AckOutcome::Finished { total }) => {
                info!(transfer_id = %ack.transfer_id, total, "all chunks acknowledged");
                Some(ClientEvent::AckProgress {
                    transfer_id: ack.transfer_id.clone(),
                    acked: total,
                    total,
                })
            }
            Ok(AckOutcome::Duplicate) => {
                trace!(transfer_id = %ack.transfer_id, seq = ack.seq, "duplicate ack");
                None
            }
            Err(e) => {
                debug!("ignoring ack: {e}");
                None
            }
        }
    }
}

/// Local requests handled on the session task.
pub(crate) enum Command {
    SendPayload {
        room: String,
        payload_name: String,
        payload_kind: String,
        payload: Vec<u8>,
        reply: oneshot::Sender<Result<SentTransfer, ClientError>>,
    },
}

/// Drives a [`Session`] until the inbound stream ends or `cancel` fires.
///
/// Cancels `cancel` on exit so the other pumps stop with it.
pub(crate) async fn run_session(
    mut session: Session,
    mut inbound_rx: mpsc::Receiver<Frame>,
    mut cmd_rx: mpsc::Receiver<Command>,
    mut writer: FrameWriter,
    events_tx: mpsc::Sender<ClientEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            frame = inbound_rx.recv() => {
                let Some(frame) = frame else {
                    debug!("inbound stream closed");
                    break;
                };
                trace!(kind = frame.kind(), "inbound frame");
                match session.handle_frame(frame, &mut writer) {
                    Some(event @ ClientEvent::AckProgress { .. }) => offer(&events_tx, event),
                    Some(event @ ClientEvent::Transfer(TransferEvent::Received(_))) => {
                        emit(&events_tx, event).await;
                        tokio::task::yield_now().await;
                    }
                    Some(event) => emit(&events_tx, event).await,
                    None => {}
                }
            }

            cmd = cmd_rx.recv() => match cmd {
                Some(Command::SendPayload { room, payload_name, payload_kind, payload, reply }) => {
                    let result = session
                        .send_payload(&mut writer, &room, &payload_name, &payload_kind, &payload)
                        .map_err(ClientError::from);
                    let _ = reply.send(result);
                }
                None => break,
            },
        }
    }

    cancel.cancel();
    for event in session.close() {
        emit(&events_tx, event).await;
    }
}

async fn emit(events_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    if events_tx.send(event).await.is_err() {
        trace!("event receiver dropped");
    }
}

/// Delivers a progress event only if the queue has room.
fn offer(events_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    match events_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => trace!("event queue full, dropping ack progress"),
        Err(mpsc::error::TrySendError::Closed(_)) => trace!("event receiver dropped"),
    }
}
