use std::time::Duration;

/// Raw bytes carried by one `audio_chunk` before base64 encoding (32 KiB).
///
/// Encoded, a chunk grows to ~43 KiB of text, which stays well below the
/// frame ceiling of common WebSocket servers.
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Largest payload a client will split and send (30 MiB).
pub const MAX_PAYLOAD_SIZE: usize = 30 * 1024 * 1024;

/// Most chunks one transfer may declare.
pub const MAX_TOTAL_CHUNKS: u32 = 1 << 20;

/// Maximum inbound frame size in bytes (64 MiB).
///
/// Sized for the whole-payload `audio` frame: a base64 encoded
/// [`MAX_PAYLOAD_SIZE`] plus JSON overhead.
pub const WS_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// How often the client pings the server.
pub const WS_PING_PERIOD: Duration = Duration::from_secs(20);

/// Read deadline: if nothing arrives within this window the connection
/// is considered dead.
pub const WS_PONG_WAIT: Duration = Duration::from_secs(60);
