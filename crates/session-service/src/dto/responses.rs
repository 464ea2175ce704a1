//! Response DTOs
//!
//! All response DTOs implement `Serialize` for JSON output.
//! IDs are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use serde::Serialize;
use session_core::value_objects::Role;

// ============================================================================
// Auth Responses
// ============================================================================

/// Login and refresh response with the token pair
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: CurrentUserResponse,
}

impl AuthResponse {
    pub fn new(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        user: CurrentUserResponse,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        }
    }
}

/// The authenticated account
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUserResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Password Reset Responses
// ============================================================================

pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset has been issued.";

/// Forgot-password acknowledgment.
///
/// Identical for known and unknown emails. Outside production it also
/// carries the raw reset secret and its expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ForgotPasswordResponse {
    pub fn generic() -> Self {
        Self {
            message: FORGOT_PASSWORD_MESSAGE.to_string(),
            reset_token: None,
            expires_at: None,
        }
    }

    pub fn with_token(reset_token: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            reset_token: Some(reset_token),
            expires_at: Some(expires_at),
            ..Self::generic()
        }
    }
}
