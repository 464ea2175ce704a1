//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use chrono::Duration;
use serde::Deserialize;
use std::env;

/// Minimum length in bytes of the access-token signing secret
pub const MIN_SECRET_LEN: usize = 32;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
    pub accounts: AccountsConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Access token signing configuration
#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Lifetime of an access token in seconds
    #[serde(default = "default_access_token_ttl")]
    pub access_token_ttl: i64,
}

impl JwtConfig {
    #[must_use]
    pub fn access_token_ttl(&self) -> Duration {
        Duration::seconds(self.access_token_ttl)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_token_ttl", &self.access_token_ttl)
            .finish_non_exhaustive()
    }
}

/// Refresh and reset token configuration
#[derive(Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC key for refresh token hashes. Must differ from the JWT secret.
    pub refresh_token_pepper: String,
    /// Lifetime of a refresh token in seconds
    #[serde(default = "default_refresh_token_ttl")]
    pub refresh_token_ttl: i64,
    /// Lifetime of a password reset token in seconds
    #[serde(default = "default_password_reset_ttl")]
    pub password_reset_ttl: i64,
}

impl SessionConfig {
    #[must_use]
    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_ttl)
    }

    #[must_use]
    pub fn password_reset_ttl(&self) -> Duration {
        Duration::seconds(self.password_reset_ttl)
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("password_reset_ttl", &self.password_reset_ttl)
            .finish_non_exhaustive()
    }
}

/// Account administration settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountsConfig {
    /// The account whose role may never be changed
    #[serde(default)]
    pub primary_admin_email: Option<String>,
}

impl AccountsConfig {
    /// Case-insensitive match against the primary admin address
    #[must_use]
    pub fn is_primary_admin(&self, email: &str) -> bool {
        self.primary_admin_email
            .as_deref()
            .is_some_and(|primary| primary.trim().eq_ignore_ascii_case(email.trim()))
    }
}

// Default value functions
fn default_app_name() -> String {
    "session-server".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_issuer() -> String {
    "session-server".to_string()
}

fn default_audience() -> String {
    "session-clients".to_string()
}

/// Longest accepted access token lifetime (1 hour)
pub const MAX_ACCESS_TOKEN_TTL: i64 = 3_600;

/// Longest accepted refresh token lifetime (365 days)
pub const MAX_REFRESH_TOKEN_TTL: i64 = 31_536_000;

/// Longest accepted password reset lifetime (1 day)
pub const MAX_PASSWORD_RESET_TTL: i64 = 86_400;

fn default_access_token_ttl() -> i64 {
    30
}

fn default_refresh_token_ttl() -> i64 {
    604_800 // 7 days
}

fn default_password_reset_ttl() -> i64 {
    900 // 15 minutes
}

/// Check the signing secret and refresh pepper before anything is minted
///
/// # Errors
/// Returns `ConfigError::InvalidValue` if the secret is too short, the pepper
/// is empty, or both are the same value.
pub fn validate_key_material(jwt: &JwtConfig, session: &SessionConfig) -> Result<(), ConfigError> {
    if jwt.secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::InvalidValue(
            "JWT_SECRET",
            format!("must be at least {MIN_SECRET_LEN} bytes"),
        ));
    }

    if session.refresh_token_pepper.is_empty() {
        return Err(ConfigError::InvalidValue(
            "REFRESH_TOKEN_PEPPER",
            "must not be empty".to_string(),
        ));
    }

    if session.refresh_token_pepper == jwt.secret {
        return Err(ConfigError::InvalidValue(
            "REFRESH_TOKEN_PEPPER",
            "must differ from JWT_SECRET".to_string(),
        ));
    }

    Ok(())
}

/// Check that no lifetime exceeds its cap
///
/// Configs built by hand skip [`AppConfig::from_lookup`], so the service
/// layer runs this too before any expiry is computed.
///
/// # Errors
/// Returns `ConfigError::InvalidValue` naming the first oversized lifetime
pub fn validate_lifetimes(jwt: &JwtConfig, session: &SessionConfig) -> Result<(), ConfigError> {
    let limits = [
        ("JWT_ACCESS_TOKEN_TTL", jwt.access_token_ttl, MAX_ACCESS_TOKEN_TTL),
        ("REFRESH_TOKEN_TTL", session.refresh_token_ttl, MAX_REFRESH_TOKEN_TTL),
        ("PASSWORD_RESET_TTL", session.password_reset_ttl, MAX_PASSWORD_RESET_TTL),
    ];

    for (key, secs, max) in limits {
        if secs > max {
            return Err(ConfigError::InvalidValue(
                key,
                format!("must be at most {max} seconds"),
            ));
        }
    }

    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or the
    /// key material is unusable
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Same as [`AppConfig::from_env`]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::MissingVar(key));

        let config = Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_max_connections),
                min_connections: lookup("DATABASE_MIN_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_min_connections),
            },
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                issuer: lookup("JWT_ISSUER").unwrap_or_else(default_issuer),
                audience: lookup("JWT_AUDIENCE").unwrap_or_else(default_audience),
                access_token_ttl: parse_ttl(
                    &lookup,
                    "JWT_ACCESS_TOKEN_TTL",
                    default_access_token_ttl(),
                    MAX_ACCESS_TOKEN_TTL,
                )?,
            },
            session: SessionConfig {
                refresh_token_pepper: required("REFRESH_TOKEN_PEPPER")?,
                refresh_token_ttl: parse_ttl(
                    &lookup,
                    "REFRESH_TOKEN_TTL",
                    default_refresh_token_ttl(),
                    MAX_REFRESH_TOKEN_TTL,
                )?,
                password_reset_ttl: parse_ttl(
                    &lookup,
                    "PASSWORD_RESET_TTL",
                    default_password_reset_ttl(),
                    MAX_PASSWORD_RESET_TTL,
                )?,
            },
            accounts: AccountsConfig {
                primary_admin_email: lookup("PRIMARY_ADMIN_EMAIL").filter(|s| !s.trim().is_empty()),
            },
        };

        validate_key_material(&config.jwt, &config.session)?;

        Ok(config)
    }
}

/// Lifetimes must be whole seconds in `1..=max`
fn parse_ttl<F>(lookup: &F, key: &'static str, default: i64, max: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(secs) if secs > 0 && secs <= max => Ok(secs),
            _ => Err(ConfigError::InvalidValue(
                key,
                format!("expected 1 to {max} seconds, got {raw:?}"),
            )),
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
