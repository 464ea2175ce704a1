//! Password hashing and the password policy
//!
//! Uses Argon2id for secure password hashing (OWASP recommended).

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};
use session_core::{DomainError, PasswordHasher};

use crate::error::AppError;

/// Minimum number of characters in a password
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum number of characters in a password; bounds the Argon2 input
pub const MAX_PASSWORD_LEN: usize = 128;

/// Argon2id implementation of the [`PasswordHasher`] port
#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordHasher;

impl Argon2PasswordHasher {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        if password.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Password is required".to_string(),
            ));
        }

        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::HashingError(e.to_string()))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        if password.is_empty() || hash.trim().is_empty() {
            return Ok(false);
        }

        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| DomainError::HashingError(format!("Invalid password hash format: {e}")))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Validate a candidate password against the account password policy
///
/// Requirements:
/// - Between 8 and 128 characters
/// - Contains at least one uppercase letter
/// - Contains at least one digit
/// - Contains at least one character that is not an ASCII letter or digit
///
/// # Errors
/// Returns `AppError::PolicyViolation` naming the first unmet requirement
pub fn validate_password_policy(password: &str) -> Result<(), AppError> {
    if password.trim().is_empty() {
        return Err(AppError::PolicyViolation(
            "Password is required".to_string(),
        ));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::PolicyViolation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }

    if password.chars().count() > MAX_PASSWORD_LEN {
        return Err(AppError::PolicyViolation(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters long"
        )));
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::PolicyViolation(
            "Password must contain at least one uppercase letter".to_string(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::PolicyViolation(
            "Password must contain at least one digit".to_string(),
        ));
    }

    if password.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::PolicyViolation(
            "Password must contain at least one special character".to_string(),
        ));
    }

    Ok(())
}
