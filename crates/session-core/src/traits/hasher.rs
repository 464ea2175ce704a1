//! Password hashing port

use crate::error::DomainError;

/// One-way password hash and verification.
///
/// `verify` returns `Ok(false)` for a mismatch; errors are reserved for
/// malformed hashes or hasher failures.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, DomainError>;

    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError>;
}
