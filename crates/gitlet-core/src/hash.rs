//! Content hashing using SHA-1.
//!
//! Blobs are hashed over their raw bytes; commits over their canonical
//! serialized form. Hashes are rendered as 40 lowercase hex characters.

use sha1::{Digest, Sha1};

/// Compute the SHA-1 hash of arbitrary bytes, returned as a hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex_encode(&result)
}

/// Encode raw bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
