//! # session-service
//!
//! Application layer: login, refresh token rotation, logout, password resets
//! and account status changes on top of the storage ports.

pub mod dto;
pub mod services;

pub use services::{
    AccountService, AuthService, CredentialService, LogoutOutcome, PasswordResetService,
    Principal, RefreshTokenLedger, ResetTokenDelivery, RevokeOutcome, ServiceContext,
    ServiceContextBuilder, ServiceError, ServiceResult, TokenPair,
};
