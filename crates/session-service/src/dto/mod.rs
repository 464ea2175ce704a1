//! Data transfer objects for the session boundary
//!
//! This module provides:
//! - Request DTOs with validation for inputs
//! - Response DTOs for serialized outputs
//! - Mappers for converting domain entities to DTOs

mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{
    AdminResetPasswordRequest, ChangeRoleRequest, ForgotPasswordRequest, LoginRequest,
    LogoutRequest, RefreshTokenRequest, RegisterRequest, ResetPasswordRequest, SetActiveRequest,
};

pub use responses::{
    AuthResponse, CurrentUserResponse, ForgotPasswordResponse, FORGOT_PASSWORD_MESSAGE,
};
