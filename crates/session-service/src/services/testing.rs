//! Fixtures shared by the service unit tests

use std::sync::Arc;

use session_common::{JwtConfig, SessionConfig};
use session_core::entities::User;
use session_core::error::DomainError;
use session_core::traits::PasswordHasher;
use session_core::value_objects::UserId;
use session_db::MemoryStore;

use super::context::{ServiceContext, ServiceContextBuilder};
use super::credentials::CredentialService;

pub const PASSWORD: &str = "Correct-Horse-9";
pub const NEW_PASSWORD: &str = "Battery-Staple-7";

/// Reversible stand-in for Argon2 so unit tests stay fast
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        Ok(format!("plain${password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        Ok(hash.strip_prefix("plain$") == Some(password))
    }
}

pub fn jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "unit-test-signing-secret-0123456789abcdef".to_string(),
        issuer: "session-server".to_string(),
        audience: "session-clients".to_string(),
        access_token_ttl: 30,
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        refresh_token_pepper: "unit-test-refresh-pepper".to_string(),
        refresh_token_ttl: 7 * 24 * 60 * 60,
        password_reset_ttl: 15 * 60,
    }
}

pub fn builder() -> ServiceContextBuilder {
    ServiceContextBuilder::new()
        .memory_store(MemoryStore::new())
        .password_hasher(Arc::new(PlainHasher))
        .jwt_config(jwt_config())
        .session_config(session_config())
}

pub fn context() -> ServiceContext {
    builder().build().unwrap()
}

pub async fn register(ctx: &ServiceContext, email: &str, password: &str) -> User {
    CredentialService::new(ctx)
        .register(email, password)
        .await
        .unwrap()
}

/// Flip account flags behind the services' back
pub async fn disable(ctx: &ServiceContext, id: UserId, deleted: bool) {
    let mut tx = ctx.sessions().begin().await.unwrap();
    tx.update_account_flags(id, false, deleted).await.unwrap();
    tx.commit().await.unwrap();
}
