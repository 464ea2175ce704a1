//! Configuration structs

mod app_config;

pub use app_config::{
    validate_key_material, validate_lifetimes, AccountsConfig, AppConfig, AppSettings,
    ConfigError, DatabaseConfig, Environment, JwtConfig, SessionConfig, MAX_ACCESS_TOKEN_TTL,
    MAX_PASSWORD_RESET_TTL, MAX_REFRESH_TOKEN_TTL, MIN_SECRET_LEN,
};
