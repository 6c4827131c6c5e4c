//! Wire protocol for Roomcast chat rooms.
//!
//! Every frame on the channel is a single JSON object whose `type` field
//! selects the variant of [`Frame`]. The chunked audio transfer frames
//! (`audio_start`, `audio_chunk`, `audio_complete`, `audio_ack`) share the
//! connection with ordinary chat traffic.

pub mod constants;
pub mod envelope;
pub mod messages;

// Re-export primary types for convenience.
pub use envelope::Frame;
pub use messages::{AudioAck, AudioChunk, AudioComplete, AudioStart};
