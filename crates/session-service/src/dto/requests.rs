//! Request DTOs
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.
//! New passwords carry no rules here: length and strength are the password
//! policy's job, so every rejection surfaces as a policy violation.

use serde::Deserialize;
use session_core::value_objects::Role;
use validator::Validate;

// ============================================================================
// Auth Requests
// ============================================================================

/// Account registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token refresh request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Logout request; the caller's identity comes from their access token
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LogoutRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

// ============================================================================
// Password Reset Requests
// ============================================================================

/// Forgot-password request. Never validated: a malformed email gets the
/// same answer as an unknown one.
#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset-password request carrying the emailed secret
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    pub new_password: String,
}

// ============================================================================
// Admin Requests
// ============================================================================

/// Admin password reset for another account
#[derive(Debug, Clone, Deserialize)]
pub struct AdminResetPasswordRequest {
    pub new_password: String,
}

/// Role change
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

/// Activate or deactivate an account
#[derive(Debug, Clone, Deserialize)]
pub struct SetActiveRequest {
    pub is_active: bool,
}
