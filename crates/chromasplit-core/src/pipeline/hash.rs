//! Content hashing of submitted images.

use blake3::Hasher as Blake3Hasher;

/// BLAKE3 hex digest of an in-memory byte buffer.
///
/// Identifies which upload a report belongs to; nothing is cached by it.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Blake3Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}
