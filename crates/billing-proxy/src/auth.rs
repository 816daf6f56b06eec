//! Password hashing and access tokens.

use crate::error::ProxyError;
use crate::store::{Role, UserRecord};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const HASH_SCHEME: &str = "sha256";
const SALT_SIZE: usize = 16;
const HASH_ROUNDS: u32 = 10_000;

fn stretch(salt: &[u8], password: &str) -> [u8; 32] {
    let mut digest: [u8; 32] = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize()
        .into();

    for _ in 1..HASH_ROUNDS {
        digest = Sha256::new()
            .chain_update(salt)
            .chain_update(digest)
            .finalize()
            .into();
    }

    digest
}

/// Hash a password with a fresh random salt.
///
/// Format: `sha256$<salt hex>$<digest hex>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = stretch(&salt, password);
    format!("{}${}${}", HASH_SCHEME, hex::encode(salt), hex::encode(digest))
}

/// Check a password against a stored hash in constant time.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(scheme), Some(salt_hex), Some(digest_hex)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };

    let actual = stretch(&salt, password);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Issues HS256 access tokens on successful login.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: SecretString,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    pub fn issue(&self, user: &UserRecord) -> Result<String, ProxyError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse");
        assert!(hash.starts_with("sha256$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("correct horsE", &hash));
        assert!(!verify_password("", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn test_hash_never_contains_password() {
        let hash = hash_password("plaintext-marker");
        assert!(!hash.contains("plaintext-marker"));
    }

    #[test]
    fn test_malformed_hash_rejected() {
        assert!(!verify_password("pw", "pw"));
        assert!(!verify_password("pw", "sha256$zz$00"));
        assert!(!verify_password("pw", "md5$00$00"));
        assert!(!verify_password("pw", ""));
    }

    #[test]
    fn test_issue_token() {
        let issuer = TokenIssuer::new(SecretString::new("test-secret".into()), Duration::hours(48));
        let user = UserRecord::new(
            "alice".into(),
            "alice@example.com".into(),
            "pw",
            "15550001111".into(),
            "US".into(),
        );

        let token = issuer.issue(&user).unwrap();
        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, user.id.to_string());
        assert_eq!(decoded.claims.role, Role::User);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 48 * 3600);
    }
}
