//! Service context - dependency container for services
//!
//! Holds the storage ports, the password hasher, the token issuers and the
//! session settings every service needs.

use std::sync::{Arc, OnceLock};

use chrono::Duration;
use session_common::{
    generate_secret, validate_key_material, validate_lifetimes, AccessTokenService,
    AccountsConfig, AppConfig, AppError, Argon2PasswordHasher, Environment, JwtConfig,
    RefreshTokenHasher, SessionConfig,
};
use session_core::traits::{PasswordHasher, SessionStore, UserRepository};
use session_db::{MemoryStore, PgPool, PgSessionStore, PgUserRepository};

use super::error::{ServiceError, ServiceResult};
use super::password_reset::ResetTokenDelivery;

/// Service context containing all dependencies
///
/// Cheap to clone; every dependency is shared behind an `Arc`.
#[derive(Clone)]
pub struct ServiceContext {
    // Storage
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,

    // Crypto
    password_hasher: Arc<dyn PasswordHasher>,
    access_tokens: Arc<AccessTokenService>,
    refresh_hasher: Arc<RefreshTokenHasher>,
    decoy_hash: Arc<OnceLock<String>>,

    // Settings
    refresh_token_ttl: Duration,
    password_reset_ttl: Duration,
    environment: Environment,
    accounts: AccountsConfig,

    reset_delivery: Option<Arc<dyn ResetTokenDelivery>>,
}

impl ServiceContext {
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    // === Storage ===

    /// Get the user repository
    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    /// Get the session store
    pub fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    // === Crypto ===

    pub fn password_hasher(&self) -> &dyn PasswordHasher {
        self.password_hasher.as_ref()
    }

    /// Get the access token issuer
    pub fn access_tokens(&self) -> &AccessTokenService {
        self.access_tokens.as_ref()
    }

    pub fn refresh_hasher(&self) -> &RefreshTokenHasher {
        self.refresh_hasher.as_ref()
    }

    /// Hash of a random password, verified against when an email is unknown
    /// so a miss costs as much as a wrong password.
    pub(crate) fn decoy_hash(&self) -> ServiceResult<&str> {
        if let Some(hash) = self.decoy_hash.get() {
            return Ok(hash.as_str());
        }
        let hash = self.password_hasher.hash(&generate_secret())?;
        Ok(self.decoy_hash.get_or_init(|| hash).as_str())
    }

    // === Settings ===

    pub fn refresh_token_ttl(&self) -> Duration {
        self.refresh_token_ttl
    }

    pub fn password_reset_ttl(&self) -> Duration {
        self.password_reset_ttl
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn accounts(&self) -> &AccountsConfig {
        &self.accounts
    }

    /// Out-of-band channel for reset secrets, if one is configured
    pub fn reset_delivery(&self) -> Option<&dyn ResetTokenDelivery> {
        self.reset_delivery.as_deref()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("storage", &"...")
            .field("access_tokens", &self.access_tokens)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("password_reset_ttl", &self.password_reset_ttl)
            .field("environment", &self.environment)
            .field("reset_delivery", &self.reset_delivery.is_some())
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    users: Option<Arc<dyn UserRepository>>,
    sessions: Option<Arc<dyn SessionStore>>,
    password_hasher: Option<Arc<dyn PasswordHasher>>,
    jwt: Option<JwtConfig>,
    session: Option<SessionConfig>,
    environment: Environment,
    accounts: AccountsConfig,
    reset_delivery: Option<Arc<dyn ResetTokenDelivery>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.users = Some(repo);
        self
    }

    pub fn sessions(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.sessions = Some(store);
        self
    }

    /// Use one in-memory store for both users and sessions
    pub fn memory_store(self, store: MemoryStore) -> Self {
        let store = Arc::new(store);
        self.users(store.clone()).sessions(store)
    }

    /// Use the PostgreSQL adapters over a shared pool
    pub fn postgres(self, pool: PgPool) -> Self {
        self.users(Arc::new(PgUserRepository::new(pool.clone())))
            .sessions(Arc::new(PgSessionStore::new(pool)))
    }

    /// Defaults to Argon2id when not set
    pub fn password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.password_hasher = Some(hasher);
        self
    }

    pub fn jwt_config(mut self, config: JwtConfig) -> Self {
        self.jwt = Some(config);
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session = Some(config);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn accounts(mut self, accounts: AccountsConfig) -> Self {
        self.accounts = accounts;
        self
    }

    /// Take the token, session and account settings from a loaded config
    pub fn app_config(self, config: &AppConfig) -> Self {
        self.jwt_config(config.jwt.clone())
            .session_config(config.session.clone())
            .environment(config.app.env)
            .accounts(config.accounts.clone())
    }

    pub fn reset_delivery(mut self, delivery: Arc<dyn ResetTokenDelivery>) -> Self {
        self.reset_delivery = Some(delivery);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::MissingDependency` if a collaborator was not set
    /// and `AppError::Configuration` if the key material is unusable or a
    /// lifetime is over its cap
    pub fn build(self) -> ServiceResult<ServiceContext> {
        let users = self
            .users
            .ok_or(ServiceError::MissingDependency("users"))?;
        let sessions = self
            .sessions
            .ok_or(ServiceError::MissingDependency("sessions"))?;
        let jwt = self
            .jwt
            .ok_or(ServiceError::MissingDependency("jwt config"))?;
        let session = self
            .session
            .ok_or(ServiceError::MissingDependency("session config"))?;

        validate_key_material(&jwt, &session).map_err(AppError::from)?;
        validate_lifetimes(&jwt, &session).map_err(AppError::from)?;

        Ok(ServiceContext {
            users,
            sessions,
            password_hasher: self
                .password_hasher
                .unwrap_or_else(|| Arc::new(Argon2PasswordHasher::new())),
            access_tokens: Arc::new(AccessTokenService::new(&jwt)?),
            refresh_hasher: Arc::new(RefreshTokenHasher::new(&session.refresh_token_pepper)?),
            decoy_hash: Arc::new(OnceLock::new()),
            refresh_token_ttl: session.refresh_token_ttl(),
            password_reset_ttl: session.password_reset_ttl(),
            environment: self.environment,
            accounts: self.accounts,
            reset_delivery: self.reset_delivery,
        })
    }
}
