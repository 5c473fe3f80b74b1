//! Digest helpers for credchain
//!
//! Passwords are stored as an unsalted SHA-256 hex digest so that ledgers
//! written by earlier deployments keep working. This is NOT secure password
//! storage: a fast unsalted hash is open to dictionary and rainbow-table
//! attacks against a leaked ledger file.

use sha2::{Digest, Sha256};

/// SHA-256 over `bytes`, lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Digest a plaintext password into the form stored in the ledger.
pub fn hash_password(password: &str) -> String {
    sha256_hex(password.as_bytes())
}

/// Check a plaintext password against a stored digest.
pub fn password_matches(password: &str, stored_digest: &str) -> bool {
    hash_password(password) == stored_digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        // sha256("abc")
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_password_round_trip() {
        let stored = hash_password("p@ss");
        assert_eq!(stored.len(), 64);
        assert!(password_matches("p@ss", &stored));
        assert!(!password_matches("wrong", &stored));
    }

    #[test]
    fn test_empty_password_has_a_digest() {
        assert_eq!(
            hash_password(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
