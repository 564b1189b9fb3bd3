//! Credential layer: password hashing and session tokens.
//!
//! Passwords are stored as PBKDF2-HMAC-SHA256 digests with a per-user random
//! salt. Session tokens are `<claims>.<signature>`, both base64url, where the
//! signature is HMAC-SHA256 over the encoded claims.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Stored form of a password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    pub salt: String,
    pub hash: String,
    pub iterations: u32,
}

pub fn hash_password(password: &str, iterations: u32) -> PasswordHash {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let iterations = iterations.max(1);
    PasswordHash {
        salt: B64.encode(salt),
        hash: B64.encode(derive_key(password, &salt, iterations)),
        iterations,
    }
}

pub fn verify_password(password: &str, stored: &PasswordHash) -> bool {
    let Ok(salt) = B64.decode(&stored.salt) else {
        return false;
    };
    let Ok(expected) = B64.decode(&stored.hash) else {
        return false;
    };
    let derived = derive_key(password, &salt, stored.iterations.max(1));
    constant_time_eq(&derived, &expected)
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Identity carried inside a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    /// Expiry, unix seconds
    pub exp: i64,
}

/// Issues and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: chrono::Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl: chrono::Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, ServiceError> {
        self.issue_at(user_id, username, chrono::Utc::now().timestamp())
    }

    pub fn issue_at(&self, user_id: &str, username: &str, now: i64) -> Result<String, ServiceError> {
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: now + self.ttl.num_seconds(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| ServiceError::Token(format!("Failed to encode claims: {}", e)))?;
        let payload = B64.encode(payload);
        let signature = B64.encode(self.mac(&payload)?.finalize().into_bytes());
        Ok(format!("{}.{}", payload, signature))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        self.verify_at(token, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, ServiceError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| ServiceError::Token("malformed token".into()))?;
        let signature = B64
            .decode(signature)
            .map_err(|_| ServiceError::Token("malformed signature".into()))?;
        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| ServiceError::Token("bad signature".into()))?;

        let bytes = B64
            .decode(payload)
            .map_err(|_| ServiceError::Token("malformed payload".into()))?;
        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|_| ServiceError::Token("malformed claims".into()))?;
        if claims.exp <= now {
            return Err(ServiceError::Token("expired".into()));
        }
        Ok(claims)
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ServiceError::Token(format!("Invalid signing key: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(mac)
    }
}
