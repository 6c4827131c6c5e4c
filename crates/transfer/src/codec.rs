//! Chunk codec: split, encode, decode and reassemble payload bytes.
//!
//! The codec knows nothing about chunk size policy; callers pass the
//! budget. Base64 padding is local to one chunk and never spans a chunk
//! boundary, so reassembly is plain concatenation of decoded slices.

use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};

use crate::TransferError;

/// Splits `payload` into consecutive slices of at most `max_chunk_bytes`.
///
/// Every slice except possibly the last is exactly `max_chunk_bytes` long.
/// An empty payload yields no slices.
pub fn split(payload: &[u8], max_chunk_bytes: usize) -> Result<Vec<&[u8]>, TransferError> {
    if max_chunk_bytes == 0 {
        return Err(TransferError::InvalidChunkSize);
    }
    Ok(payload.chunks(max_chunk_bytes).collect())
}

/// Encodes one chunk as standard padded base64.
pub fn encode_chunk(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes one chunk produced by [`encode_chunk`].
///
/// Non-canonical input (bad alphabet, missing padding, trailing bits)
/// fails instead of yielding truncated bytes.
pub fn decode_chunk(text: &str) -> Result<Vec<u8>, TransferError> {
    STANDARD
        .decode(text)
        .map_err(|e| TransferError::MalformedEncoding(e.to_string()))
}

/// Concatenates decoded chunks in the given order.
pub fn reassemble<I, C>(ordered_chunks: I) -> Vec<u8>
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for chunk in ordered_chunks {
        out.extend_from_slice(chunk.as_ref());
    }
    out
}

/// Computes SHA-256 of `data` and returns the hex-encoded digest.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
