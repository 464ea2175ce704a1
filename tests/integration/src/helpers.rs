//! Test helpers for integration tests
//!
//! Provides a harness that wires the real hasher, token services and
//! storage together, plus assertions on service errors.

use std::fmt::Debug;

use anyhow::{bail, Result};
use chrono::Utc;
use session_common::{try_init_tracing_with_config, AppConfig, AppError, TracingConfig};
use session_core::entities::User;
use session_core::value_objects::UserId;
use session_db::{create_pool, run_migrations, MemoryStore, PoolConfig};
use session_service::dto::{AuthResponse, RefreshTokenRequest};
use session_service::{
    AccountService, AuthService, PasswordResetService, ServiceContext, ServiceError,
    ServiceResult,
};

use crate::fixtures::{TestAccount, PASSWORD};

pub const JWT_SECRET: &str = "integration-signing-secret-0123456789abcdef";
pub const REFRESH_PEPPER: &str = "integration-refresh-token-pepper";
pub const PRIMARY_ADMIN_EMAIL: &str = "root-admin@example.com";

/// Configuration with test key material and no environment leakage
pub fn test_config(database_url: &str) -> Result<AppConfig> {
    test_config_with(database_url, &[])
}

/// Test configuration with some variables overridden
pub fn test_config_with(database_url: &str, overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let config = AppConfig::from_lookup(|key| {
        if let Some((_, value)) = overrides.iter().find(|(name, _)| *name == key) {
            return Some((*value).to_string());
        }
        match key {
            "DATABASE_URL" => Some(database_url.to_string()),
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "REFRESH_TOKEN_PEPPER" => Some(REFRESH_PEPPER.to_string()),
            "PRIMARY_ADMIN_EMAIL" => Some(PRIMARY_ADMIN_EMAIL.to_string()),
            _ => None,
        }
    })?;
    Ok(config)
}

/// Check if the PostgreSQL test environment is configured
pub fn check_test_env() -> Option<String> {
    let _ = dotenvy::dotenv();

    match std::env::var("DATABASE_URL") {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: DATABASE_URL not set");
            None
        }
    }
}

/// A fully wired service context
pub struct TestHarness {
    pub ctx: ServiceContext,
}

impl TestHarness {
    /// Harness over a fresh in-memory store
    pub fn memory() -> Result<Self> {
        Self::memory_with(test_config("postgres://unused")?)
    }

    /// Harness over a fresh in-memory store with custom config
    pub fn memory_with(config: AppConfig) -> Result<Self> {
        let _ = try_init_tracing_with_config(&TracingConfig::test());

        let ctx = ServiceContext::builder()
            .memory_store(MemoryStore::new())
            .app_config(&config)
            .build()?;
        Ok(Self { ctx })
    }

    /// Harness over the database named by `DATABASE_URL`, migrated.
    /// Returns `None` when the variable is unset.
    pub async fn postgres() -> Result<Option<Self>> {
        let Some(url) = check_test_env() else {
            return Ok(None);
        };
        let _ = try_init_tracing_with_config(&TracingConfig::test());

        let config = test_config(&url)?;
        let pool = create_pool(&PoolConfig::new(url)).await?;
        run_migrations(&pool).await?;

        let ctx = ServiceContext::builder()
            .postgres(pool)
            .app_config(&config)
            .build()?;
        Ok(Some(Self { ctx }))
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.ctx)
    }

    pub fn accounts(&self) -> AccountService<'_> {
        AccountService::new(&self.ctx)
    }

    pub fn resets(&self) -> PasswordResetService<'_> {
        PasswordResetService::new(&self.ctx)
    }

    /// Register a fresh account and return it
    pub async fn register(&self, account: &TestAccount) -> Result<User> {
        let created = self.auth().register(account.register_request()).await?;
        let id: UserId = created.id.parse()?;
        match self.ctx.users().find_by_id(id).await? {
            Some(user) => Ok(user),
            None => bail!("registered account {id} not found"),
        }
    }

    /// Register a fresh unique account and log it in
    pub async fn signed_in(&self) -> Result<(TestAccount, User, AuthResponse)> {
        let account = TestAccount::unique();
        let user = self.register(&account).await?;
        let session = self.auth().login(account.login_request()).await?;
        Ok((account, user, session))
    }

    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<AuthResponse> {
        self.auth()
            .refresh(RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })
            .await
    }

    /// The primary admin, created on first use
    pub async fn admin(&self) -> Result<User> {
        Ok(self
            .accounts()
            .bootstrap_admin(PRIMARY_ADMIN_EMAIL, PASSWORD)
            .await?)
    }

    /// Live refresh tokens the account holds right now
    pub async fn active_sessions(&self, user_id: UserId) -> Result<u64> {
        Ok(self
            .ctx
            .sessions()
            .count_active_refresh_tokens(user_id, Utc::now())
            .await?)
    }
}

/// Unwrap the application error of a failed call
pub fn app_error<T: Debug>(result: ServiceResult<T>) -> Result<AppError> {
    match result {
        Ok(value) => bail!("expected an error, got {value:?}"),
        Err(ServiceError::App(err)) => Ok(err),
        Err(other) => bail!("expected an application error, got {other}"),
    }
}
