//! Invite token generation and hashing.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Generate a 256-bit random invite token, hex-encoded (64 lowercase hex chars).
pub fn generate_invite_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 of the token, hex-encoded. Only the hash is persisted.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::is_valid_invite_token;

    #[test]
    fn test_token_format() {
        for _ in 0..100 {
            let token = generate_invite_token();
            assert_eq!(token.len(), 64);
            assert!(is_valid_invite_token(&token));
        }
    }

    #[test]
    fn test_token_uniqueness() {
        use std::collections::HashSet;
        let tokens: HashSet<String> = (0..100).map(|_| generate_invite_token()).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_hash_is_stable_and_differs_from_token() {
        let token = generate_invite_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
        assert_eq!(hash_token(&token).len(), 64);
    }
}
