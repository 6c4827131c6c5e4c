//! Chunked payload transfer over a size-limited text frame channel.
//!
//! A payload is split into sequenced base64 chunks, announced with
//! `audio_start`, streamed as `audio_chunk` frames and closed with
//! `audio_complete`. Receivers collect chunks by `seq`, acknowledge each
//! one and rebuild the payload byte-exact.

mod acks;
pub mod codec;
mod receiver;
mod sender;
mod store;
mod validation;

pub use acks::{AckLedger, AckOutcome};
pub use codec::{checksum_bytes, decode_chunk, encode_chunk, reassemble, split};
pub use receiver::{FailureReason, ReceivedPayload, TransferEvent, TransferReceiver};
pub use sender::{FrameSink, SentTransfer, TransferSender};
pub use store::{PutOutcome, Transfer, TransferMeta, TransferStore};
pub use validation::sanitize_payload_name;

pub use roomcast_protocol::constants::{DEFAULT_CHUNK_SIZE, MAX_PAYLOAD_SIZE, MAX_TOTAL_CHUNKS};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("malformed chunk encoding: {0}")]
    MalformedEncoding(String),

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("duplicate transfer: {0}")]
    DuplicateTransfer(String),

    #[error("unknown transfer: {0}")]
    UnknownTransfer(String),

    #[error("transfer {0} declares zero chunks")]
    InvalidTotalChunks(String),

    #[error("chunk {seq} out of range (total {total})")]
    SeqOutOfRange { seq: u32, total: u32 },

    #[error("payload is empty")]
    EmptyPayload,

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("too many chunks: {0} (max {max})", max = MAX_TOTAL_CHUNKS)]
    TooManyChunks(usize),

    #[error("invalid payload name: {0}")]
    InvalidName(String),

    #[error("frame encoding failed: {0}")]
    Encode(String),

    #[error("channel closed")]
    Closed,
}
