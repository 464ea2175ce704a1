//! Opaque token secrets and their stored hashes
//!
//! Raw secrets are handed to the client once and never persisted. Refresh
//! tokens are stored as HMAC-SHA256 under a server-side pepper; reset tokens
//! as a plain SHA-256 digest.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Bytes of OS randomness behind every opaque secret (512 bits)
pub const SECRET_BYTES: usize = 64;

type HmacSha256 = Hmac<Sha256>;

/// Generate a new high-entropy secret, base64url without padding
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Keyed hash for refresh tokens
#[derive(Clone)]
pub struct RefreshTokenHasher {
    pepper: Vec<u8>,
}

impl RefreshTokenHasher {
    /// # Errors
    /// Returns `AppError::Configuration` if the pepper is empty
    pub fn new(pepper: &str) -> Result<Self, AppError> {
        if pepper.is_empty() {
            return Err(AppError::Configuration(
                "refresh token pepper is not configured".to_string(),
            ));
        }

        Ok(Self {
            pepper: pepper.as_bytes().to_vec(),
        })
    }

    /// Lowercase hex HMAC-SHA256 of the raw token
    ///
    /// # Errors
    /// Returns `AppError::Configuration` if the key is rejected by the MAC
    pub fn hash(&self, raw: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.pepper)
            .map_err(|e| AppError::Configuration(format!("invalid refresh token pepper: {e}")))?;
        mac.update(raw.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for RefreshTokenHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenHasher").finish_non_exhaustive()
    }
}

/// Lowercase hex SHA-256 of a raw password reset token
pub fn hash_reset_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
