use sha2::{Digest, Sha256};

/// SHA-256 of the raw file bytes, lowercase hex.
///
/// Depends on nothing but the bytes: the same upload hashes identically
/// whatever its filename or declared format, which is what makes it
/// usable as a deduplication key.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
