use roomcast_protocol::{AudioChunk, AudioComplete, AudioStart, Frame};
use tracing::{debug, info, trace};

use crate::codec::{checksum_bytes, encode_chunk, split};
use crate::{DEFAULT_CHUNK_SIZE, MAX_PAYLOAD_SIZE, MAX_TOTAL_CHUNKS, TransferError};

/// Destination for outbound frames.
///
/// Frames handed to one sink must reach the channel in the order they
/// were sent; that is the only ordering the protocol relies on.
pub trait FrameSink {
    fn send_frame(&mut self, frame: Frame) -> Result<(), TransferError>;
}

impl FrameSink for Vec<Frame> {
    fn send_frame(&mut self, frame: Frame) -> Result<(), TransferError> {
        self.push(frame);
        Ok(())
    }
}

/// Summary of a payload that was fully emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransfer {
    pub transfer_id: String,
    pub total_chunks: u32,
}

/// Streams a payload as `audio_start`, `audio_chunk`* and `audio_complete`.
///
/// The sender keeps no per-transfer state: it emits straight from the
/// caller's buffer and does not wait for acknowledgments.
#[derive(Debug, Clone)]
pub struct TransferSender {
    identity: String,
    chunk_size: usize,
    max_payload: usize,
}

impl TransferSender {
    /// Creates a sender for the local user `identity`.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }

    /// Overrides the raw byte budget per chunk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Overrides the largest payload accepted by [`send_payload`](Self::send_payload).
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Emits one complete transfer of `payload` into `sink`.
    ///
    /// Nothing is emitted if the payload is rejected up front; a sink error
    /// part-way through aborts the remaining frames.
    pub fn send_payload(
        &self,
        sink: &mut dyn FrameSink,
        room: &str,
        payload_name: &str,
        payload_kind: &str,
        payload: &[u8],
    ) -> Result<SentTransfer, TransferError> {
        if payload.is_empty() {
            return Err(TransferError::EmptyPayload);
        }
        if payload.len() > self.max_payload {
            return Err(TransferError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }

        let chunks = split(payload, self.chunk_size)?;
        let total_chunks = u32::try_from(chunks.len())
            .ok()
            .filter(|&n| n <= MAX_TOTAL_CHUNKS)
            .ok_or(TransferError::TooManyChunks(chunks.len()))?;
        let transfer_id = uuid::Uuid::new_v4().to_string();

        debug!(
            transfer_id = %transfer_id,
            room,
            name = payload_name,
            bytes = payload.len(),
            total_chunks,
            "starting transfer"
        );

        sink.send_frame(Frame::AudioStart(AudioStart {
            transfer_id: transfer_id.clone(),
            room: room.to_string(),
            from: self.identity.clone(),
            audio_name: payload_name.to_string(),
            audio_type: payload_kind.to_string(),
            total_chunks,
            checksum: checksum_bytes(payload),
        }))?;

        for (seq, chunk) in (0u32..).zip(chunks) {
            trace!(transfer_id = %transfer_id, seq, bytes = chunk.len(), "sending chunk");
            sink.send_frame(Frame::AudioChunk(AudioChunk {
                transfer_id: transfer_id.clone(),
                seq,
                total: total_chunks,
                data: encode_chunk(chunk),
                is_last: seq == total_chunks - 1,
            }))?;
        }

        sink.send_frame(Frame::AudioComplete(AudioComplete {
            transfer_id: transfer_id.clone(),
            room: room.to_string(),
        }))?;

        info!(
            transfer_id = %transfer_id,
            name = payload_name,
            total_chunks,
            "transfer emitted"
        );

        Ok(SentTransfer {
            transfer_id,
            total_chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_chunk, reassemble};

    /// Sink that fails after accepting `remaining` frames.
    struct FailingSink {
        remaining: usize,
        sent: Vec<Frame>,
    }

    impl FrameSink for FailingSink {
        fn send_frame(&mut self, frame: Frame) -> Result<(), TransferError> {
            if self.remaining == 0 {
                return Err(TransferError::Closed);
            }
            self.remaining -= 1;
            self.sent.push(frame);
            Ok(())
        }
    }

    #[test]
    fn emits_start_chunks_complete_in_order() {
        let sender = TransferSender::new("ana").with_chunk_size(4);
        let mut sink = Vec::new();
        let sent = sender
            .send_payload(&mut sink, "lobby", "memo.webm", "audio/webm", b"AABBCCDDEE")
            .unwrap();

        assert_eq!(sent.total_chunks, 3);
        assert_eq!(sink.len(), 5);

        match &sink[0] {
            Frame::AudioStart(start) => {
                assert_eq!(start.transfer_id, sent.transfer_id);
                assert_eq!(start.room, "lobby");
                assert_eq!(start.from, "ana");
                assert_eq!(start.audio_name, "memo.webm");
                assert_eq!(start.audio_type, "audio/webm");
                assert_eq!(start.total_chunks, 3);
                assert_eq!(start.checksum, checksum_bytes(b"AABBCCDDEE"));
            }
            other => panic!("expected audio_start, got {other:?}"),
        }

        let mut decoded = Vec::new();
        for (i, frame) in sink[1..4].iter().enumerate() {
            match frame {
                Frame::AudioChunk(chunk) => {
                    assert_eq!(chunk.transfer_id, sent.transfer_id);
                    assert_eq!(chunk.seq, i as u32);
                    assert_eq!(chunk.total, 3);
                    assert_eq!(chunk.is_last, i == 2);
                    decoded.push(decode_chunk(&chunk.data).unwrap());
                }
                other => panic!("expected audio_chunk, got {other:?}"),
            }
        }
        assert_eq!(reassemble(decoded), b"AABBCCDDEE");

        assert!(matches!(
            &sink[4],
            Frame::AudioComplete(c) if c.transfer_id == sent.transfer_id && c.room == "lobby"
        ));
    }

    #[test]
    fn single_chunk_is_last() {
        let sender = TransferSender::new("ana");
        let mut sink = Vec::new();
        sender
            .send_payload(&mut sink, "lobby", "a.ogg", "audio/ogg", b"tiny")
            .unwrap();
        assert_eq!(sink.len(), 3);
        assert!(matches!(&sink[1], Frame::AudioChunk(c) if c.seq == 0 && c.is_last));
    }

    #[test]
    fn transfer_ids_are_unique() {
        let sender = TransferSender::new("ana");
        let mut sink = Vec::new();
        let a = sender
            .send_payload(&mut sink, "lobby", "a", "audio/ogg", b"x")
            .unwrap();
        let b = sender
            .send_payload(&mut sink, "lobby", "b", "audio/ogg", b"x")
            .unwrap();
        assert_ne!(a.transfer_id, b.transfer_id);
    }

    #[test]
    fn rejects_empty_payload() {
        let sender = TransferSender::new("ana");
        let mut sink = Vec::new();
        let err = sender
            .send_payload(&mut sink, "lobby", "a", "audio/ogg", b"")
            .unwrap_err();
        assert!(matches!(err, TransferError::EmptyPayload));
        assert!(sink.is_empty());
    }

    #[test]
    fn rejects_oversized_payload() {
        let sender = TransferSender::new("ana").with_max_payload(8);
        let mut sink = Vec::new();
        let err = sender
            .send_payload(&mut sink, "lobby", "a", "audio/ogg", &[0u8; 9])
            .unwrap_err();
        assert!(matches!(err, TransferError::PayloadTooLarge { size: 9, max: 8 }));
        assert!(sink.is_empty());
    }

    #[test]
    fn rejects_zero_chunk_size() {
        let sender = TransferSender::new("ana").with_chunk_size(0);
        let mut sink = Vec::new();
        assert!(matches!(
            sender.send_payload(&mut sink, "lobby", "a", "audio/ogg", b"x"),
            Err(TransferError::InvalidChunkSize)
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn rejects_more_chunks_than_receivers_accept() {
        let sender = TransferSender::new("ana").with_chunk_size(1);
        let mut sink = Vec::new();
        let payload = vec![7u8; MAX_TOTAL_CHUNKS as usize + 1];
        assert!(matches!(
            sender.send_payload(&mut sink, "lobby", "a", "audio/ogg", &payload),
            Err(TransferError::TooManyChunks(n)) if n == payload.len()
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn sink_failure_stops_emission() {
        let sender = TransferSender::new("ana").with_chunk_size(1);
        let mut sink = FailingSink {
            remaining: 2,
            sent: Vec::new(),
        };
        let err = sender
            .send_payload(&mut sink, "lobby", "a", "audio/ogg", b"abcd")
            .unwrap_err();
        assert!(matches!(err, TransferError::Closed));
        assert_eq!(sink.sent.len(), 2);
    }
}
