//! Room client for the Roomcast chat server.
//!
//! Wraps one WebSocket connection: read and write pumps move frames,
//! and a single session task routes them either to the chunked transfer
//! receiver or out to the caller as chat events.

pub mod error;
mod pumps;
mod session;
pub mod types;
pub mod ws_client;

pub use error::ClientError;
pub use session::Session;
pub use types::{ClientEvent, SessionOptions};
pub use ws_client::RoomClient;
