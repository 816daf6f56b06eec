//! Challenge-response helpers for PIN recharges.
//!
//! The provider never receives a PIN user's password. Instead each recharge
//! carries a fresh nonce and `MD5(nonce || user || password)` as lowercase hex.

use md5::{Digest, Md5};
use rand::RngCore;

/// Number of random bytes in a nonce (rendered as twice as many hex chars).
const NONCE_BYTES: usize = 3;

/// Generate a fresh nonce: 3 random bytes as 6 uppercase hex characters.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode_upper(bytes)
}

/// Compute the recharge digest for a PIN user.
pub fn challenge_digest(nonce: &str, user: &str, password: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(nonce.as_bytes());
    hasher.update(user.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_format() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 6);
        assert!(nonce
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_nonces_vary() {
        let nonces: std::collections::HashSet<_> = (0..32).map(|_| generate_nonce()).collect();
        assert!(nonces.len() > 1);
    }

    #[test]
    fn test_digest_matches_md5_of_concatenation() {
        // md5("ABC123" + "5551234" + "secret")
        let expected = hex::encode(Md5::digest(b"ABC1235551234secret"));
        assert_eq!(challenge_digest("ABC123", "5551234", "secret"), expected);
    }

    #[test]
    fn test_digest_known_vector() {
        // md5("abc")
        assert_eq!(
            challenge_digest("a", "b", "c"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_digest_deterministic_and_sensitive() {
        let base = challenge_digest("0A1B2C", "778899", "pw");
        assert_eq!(base, challenge_digest("0A1B2C", "778899", "pw"));
        assert_ne!(base, challenge_digest("0A1B2D", "778899", "pw"));
        assert_ne!(base, challenge_digest("0A1B2C", "778898", "pw"));
        assert_ne!(base, challenge_digest("0A1B2C", "778899", "pW"));
        assert_eq!(base.len(), 32);
        assert_eq!(base, base.to_lowercase());
    }
}
