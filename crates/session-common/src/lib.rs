//! # session-common
//!
//! Shared utilities: configuration, the application error taxonomy, token and
//! password cryptography, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{
    generate_secret, hash_reset_token, validate_password_policy, AccessClaims,
    AccessTokenService, Argon2PasswordHasher, IssuedAccessToken, RefreshTokenHasher,
};
pub use config::{
    validate_key_material, validate_lifetimes, AccountsConfig, AppConfig, AppSettings,
    ConfigError, DatabaseConfig, Environment, JwtConfig, SessionConfig,
};
pub use error::{AppError, AppResult, ErrorResponse};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
