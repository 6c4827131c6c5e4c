use std::time::Duration;

use roomcast_protocol::{AudioAck, AudioChunk, AudioComplete, AudioStart, Frame};
use tracing::{debug, info, trace, warn};

use crate::codec::{checksum_bytes, decode_chunk, reassemble};
use crate::sender::FrameSink;
use crate::TransferError;
use crate::store::{Transfer, TransferMeta, TransferStore};

/// A payload rebuilt from all of its chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedPayload {
    pub transfer_id: String,
    pub room: String,
    pub sender: String,
    pub payload_name: String,
    pub payload_kind: String,
    pub total_chunks: u32,
    pub data: Vec<u8>,
    /// Time since `audio_start` was observed. Diagnostics only.
    pub elapsed: Duration,
}

/// Why a transfer ended without a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureReason {
    #[error("{} chunks missing", .missing.len())]
    Incomplete { missing: Vec<u32> },

    /// `chunks` failed to decode; `missing` never arrived at all.
    #[error("{} chunks could not be decoded, {} missing", .chunks.len(), .missing.len())]
    Malformed { chunks: Vec<u32>, missing: Vec<u32> },

    #[error("payload exceeds {max} bytes")]
    TooLarge { max: usize },

    #[error("payload checksum mismatch")]
    ChecksumMismatch,
}

/// Notifications for the layer that renders transfers to the user.
///
/// For each transfer at most one of `Received`, `Failed` or `Abandoned`
/// is ever produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    Started {
        transfer_id: String,
        room: String,
        from: String,
        payload_name: String,
        total_chunks: u32,
    },
    Received(ReceivedPayload),
    Failed {
        transfer_id: String,
        room: String,
        from: String,
        payload_name: String,
        reason: FailureReason,
    },
    /// The connection closed while the transfer was still active.
    Abandoned {
        transfer_id: String,
        room: String,
        payload_name: String,
        received: u32,
        total: u32,
    },
}

/// Receiving half of the chunked transfer protocol.
///
/// Per transfer id: unseen -> active -> reconstructed | failed. Frames
/// for ids that are unseen or already finished are logged and dropped.
#[derive(Debug)]
pub struct TransferReceiver {
    identity: String,
    store: TransferStore,
}

impl TransferReceiver {
    /// Creates a receiver for the local user `identity`.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            store: TransferStore::new(),
        }
    }

    /// Caps the decoded bytes one inbound transfer may buffer.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.store = std::mem::take(&mut self.store).with_max_payload(max_payload);
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn store(&self) -> &TransferStore {
        &self.store
    }

    /// Routes one inbound frame. Acks go to `sink`.
    ///
    /// Non-transfer frames and `audio_ack` are ignored here.
    pub fn handle(&mut self, frame: &Frame, sink: &mut dyn FrameSink) -> Option<TransferEvent> {
        match frame {
            Frame::AudioStart(start) => self.on_start(start),
            Frame::AudioChunk(chunk) => self.on_chunk(chunk, sink),
            Frame::AudioComplete(complete) => self.on_complete(complete),
            _ => None,
        }
    }

    pub fn on_start(&mut self, start: &AudioStart) -> Option<TransferEvent> {
        if start.from == self.identity {
            debug!(transfer_id = %start.transfer_id, "ignoring echo of own transfer");
            return None;
        }

        let meta = TransferMeta {
            room: start.room.clone(),
            sender: start.from.clone(),
            payload_name: start.audio_name.clone(),
            payload_kind: start.audio_type.clone(),
            total_chunks: start.total_chunks,
            checksum: start.checksum.clone(),
        };

        match self.store.begin(&start.transfer_id, meta) {
            Ok(transfer) => {
                info!(
                    transfer_id = %start.transfer_id,
                    from = %start.from,
                    name = %start.audio_name,
                    total_chunks = transfer.total_chunks(),
                    "receiving transfer"
                );
                Some(TransferEvent::Started {
                    transfer_id: start.transfer_id.clone(),
                    room: start.room.clone(),
                    from: start.from.clone(),
                    payload_name: start.audio_name.clone(),
                    total_chunks: start.total_chunks,
                })
            }
            Err(e) => {
                warn!(transfer_id = %start.transfer_id, "ignoring audio_start: {e}");
                None
            }
        }
    }

    pub fn on_chunk(
        &mut self,
        chunk: &AudioChunk,
        sink: &mut dyn FrameSink,
    ) -> Option<TransferEvent> {
        let id = chunk.transfer_id.as_str();
        let Some(transfer) = self.store.get(id) else {
            debug!(transfer_id = %id, seq = chunk.seq, "chunk for unknown transfer, ignoring");
            return None;
        };
        if chunk.total != transfer.total_chunks() {
            warn!(
                transfer_id = %id,
                seq = chunk.seq,
                total = chunk.total,
                expected = transfer.total_chunks(),
                "chunk disagrees on chunk count, ignoring"
            );
            return None;
        }

        let bytes = match decode_chunk(&chunk.data) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(transfer_id = %id, seq = chunk.seq, "dropping chunk: {e}");
                if let Err(e) = self.store.note_malformed(id, chunk.seq) {
                    debug!(transfer_id = %id, "could not record malformed chunk: {e}");
                }
                return None;
            }
        };

        match self.store.put_chunk(id, chunk.seq, bytes) {
            Ok(outcome) if outcome.already_had => {
                debug!(transfer_id = %id, seq = chunk.seq, "duplicate chunk");
            }
            Ok(_) => {
                if let Some(t) = self.store.get(id) {
                    trace!(
                        transfer_id = %id,
                        seq = chunk.seq,
                        received = t.received_count(),
                        total = t.total_chunks(),
                        "chunk stored"
                    );
                }
            }
            Err(TransferError::PayloadTooLarge { size, max }) => {
                warn!(transfer_id = %id, seq = chunk.seq, size, max, "transfer exceeds payload cap");
                return self.fail(id, FailureReason::TooLarge { max });
            }
            Err(e) => {
                warn!(transfer_id = %id, "dropping chunk: {e}");
                return None;
            }
        }

        // Duplicates are acked too.
        let ack = Frame::AudioAck(AudioAck {
            transfer_id: id.to_string(),
            seq: chunk.seq,
        });
        if let Err(e) = sink.send_frame(ack) {
            warn!(transfer_id = %id, seq = chunk.seq, "failed to send ack: {e}");
        }

        if self.store.is_complete(id) {
            return self.reconstruct(id);
        }
        None
    }

    pub fn on_complete(&mut self, complete: &AudioComplete) -> Option<TransferEvent> {
        let id = complete.transfer_id.as_str();
        if !self.store.contains(id) {
            debug!(transfer_id = %id, "completion for unknown or finished transfer, ignoring");
            return None;
        }
        if self.store.is_complete(id) {
            return self.reconstruct(id);
        }

        let reason = match self.store.get(id) {
            Some(transfer) => {
                let malformed: Vec<u32> = transfer.malformed().collect();
                let missing = transfer.missing();
                if malformed.is_empty() {
                    FailureReason::Incomplete { missing }
                } else {
                    let missing = missing
                        .into_iter()
                        .filter(|seq| !malformed.contains(seq))
                        .collect();
                    FailureReason::Malformed {
                        chunks: malformed,
                        missing,
                    }
                }
            }
            None => return None,
        };
        self.fail(id, reason)
    }

    /// Drops every active transfer, e.g. after the connection closed.
    pub fn abandon_all(&mut self) -> Vec<TransferEvent> {
        self.store
            .abandon_all()
            .into_iter()
            .map(|transfer| {
                info!(
                    transfer_id = %transfer.id(),
                    received = transfer.received_count(),
                    total = transfer.total_chunks(),
                    "abandoning transfer"
                );
                let meta = transfer.meta();
                TransferEvent::Abandoned {
                    transfer_id: transfer.id().to_string(),
                    room: meta.room.clone(),
                    payload_name: meta.payload_name.clone(),
                    received: transfer.received_count(),
                    total: transfer.total_chunks(),
                }
            })
            .collect()
    }

    fn fail(&mut self, id: &str, reason: FailureReason) -> Option<TransferEvent> {
        let transfer = match self.store.finish(id) {
            Ok(t) => t,
            Err(e) => {
                warn!("{e}");
                return None;
            }
        };
        warn!(
            transfer_id = %id,
            name = %transfer.meta().payload_name,
            received = transfer.received_count(),
            total = transfer.total_chunks(),
            "transfer failed: {reason}"
        );
        Some(failed(transfer, reason))
    }

    fn reconstruct(&mut self, id: &str) -> Option<TransferEvent> {
        match self.store.missing(id) {
            Ok(missing) if missing.is_empty() => {}
            Ok(missing) => {
                warn!(transfer_id = %id, missing = missing.len(), "reconstruction with chunks missing, skipping");
                return None;
            }
            Err(e) => {
                debug!("{e}");
                return None;
            }
        }

        let transfer = self.store.finish(id).ok()?;
        let data = match transfer.ordered_chunks() {
            Some(chunks) => reassemble(chunks),
            None => {
                let reason = FailureReason::Incomplete {
                    missing: transfer.missing(),
                };
                return Some(failed(transfer, reason));
            }
        };

        let meta = transfer.meta();
        if !meta.checksum.is_empty() && !checksum_bytes(&data).eq_ignore_ascii_case(&meta.checksum)
        {
            warn!(transfer_id = %id, name = %meta.payload_name, "payload checksum mismatch");
            return Some(failed(transfer, FailureReason::ChecksumMismatch));
        }

        let elapsed = transfer.started_at().elapsed();
        info!(
            transfer_id = %id,
            name = %meta.payload_name,
            bytes = data.len(),
            chunks = transfer.total_chunks(),
            elapsed_ms = elapsed.as_millis() as u64,
            "payload reconstructed"
        );

        Some(TransferEvent::Received(ReceivedPayload {
            transfer_id: transfer.id().to_string(),
            room: meta.room.clone(),
            sender: meta.sender.clone(),
            payload_name: meta.payload_name.clone(),
            payload_kind: meta.payload_kind.clone(),
            total_chunks: transfer.total_chunks(),
            data,
            elapsed,
        }))
    }
}

fn failed(transfer: Transfer, reason: FailureReason) -> TransferEvent {
    let meta = transfer.meta();
    TransferEvent::Failed {
        transfer_id: transfer.id().to_string(),
        room: meta.room.clone(),
        from: meta.sender.clone(),
        payload_name: meta.payload_name.clone(),
        reason,
    }
}
