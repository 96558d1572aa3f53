//! Canonical state fingerprints.
//!
//! The hash of a session is SHA-256 over the bincode encoding of the game's
//! snapshot, so two sessions agree on it exactly when their snapshots are
//! byte-identical.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::SessionError;

/// Hex-encoded SHA-256 of `snapshot`.
pub fn state_hash<S: Serialize>(snapshot: &S) -> Result<String, SessionError> {
    let bytes = bincode::serialize(snapshot)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// First 16 hex digits, for compact log lines.
pub fn short(hash: &str) -> &str {
    hash.get(..16).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consistency() {
        let hash1 = state_hash(&(1u8, "state")).unwrap();
        let hash2 = state_hash(&(1u8, "state")).unwrap();
        assert_eq!(hash1, hash2, "Same snapshot should produce same hash");
        assert_ne!(hash1, state_hash(&(2u8, "state")).unwrap());
    }

    #[test]
    fn test_hash_format() {
        let hash = state_hash(&vec![1i64, 2, 3]).unwrap();
        assert_eq!(hash.len(), 64, "Hash should be 64 hex chars (32 bytes)");
        assert!(
            hash.chars().all(|c| c.is_ascii_hexdigit()),
            "Hash should only contain hex digits"
        );
        assert_eq!(short(&hash).len(), 16);
    }
}
