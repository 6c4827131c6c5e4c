//! Public types for the room client.

use roomcast_protocol::Frame;
use roomcast_protocol::constants::{DEFAULT_CHUNK_SIZE, MAX_PAYLOAD_SIZE};
use roomcast_transfer::TransferEvent;

/// Events emitted by a connected [`RoomClient`](crate::RoomClient).
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// Progress or outcome of an inbound chunked transfer.
    Transfer(TransferEvent),
    /// Any frame unrelated to chunked transfers: chat, system notices,
    /// room and user lists, errors.
    Chat(Frame),
    /// A peer acknowledged a chunk of a transfer this client sent.
    AckProgress {
        transfer_id: String,
        acked: u32,
        total: u32,
    },
    /// The connection is gone. Always the last event.
    Disconnected,
}

/// Tuning for outbound transfers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Raw bytes per chunk before encoding.
    pub chunk_size: usize,
    /// Largest payload accepted by `send_payload`.
    pub max_payload: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_payload: MAX_PAYLOAD_SIZE,
        }
    }
}
