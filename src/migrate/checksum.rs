//! Content checksums for migration sources.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const CHECKSUM_LEN: usize = 64;

/// Hex SHA-256 of the raw source bytes.
pub fn checksum(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// True if `s` looks like a value produced by [`checksum`].
pub fn is_checksum(s: &str) -> bool {
    s.len() == CHECKSUM_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_deterministic() {
        let source = b"[[up]]\ndrop_tables = [{ name = \"t\" }]\n";
        assert_eq!(checksum(source), checksum(source));
        assert!(is_checksum(&checksum(source)));
    }

    #[test]
    fn test_one_byte_changes_digest() {
        assert_ne!(checksum(b"name = \"a\""), checksum(b"name = \"b\""));
    }

    #[test]
    fn test_is_checksum() {
        assert!(!is_checksum("abc"));
        assert!(!is_checksum(&"G".repeat(CHECKSUM_LEN)));
        assert!(!is_checksum(&"A".repeat(CHECKSUM_LEN)));
    }
}
