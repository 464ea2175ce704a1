//! In-memory session store
//!
//! Committed state sits behind an `RwLock`. A transaction takes the writer
//! mutex for its whole lifetime, works on a private copy of the tables and
//! swaps it in on commit, so transactions are fully serialized and an
//! uncommitted one leaves no trace. Plain reads never wait on an open
//! transaction; they see the last committed state.
//!
//! Each `begin` clones every table, and revoked refresh tokens are never
//! deleted, so the cost of a transaction grows with the whole history.
//! Use it for tests and small local setups, not production traffic.
//!
//! `UserRepository::create` also takes the writer mutex, so it must not be
//! called while the same task holds an open transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::instrument;

use session_core::entities::{
    NewPasswordResetToken, NewRefreshToken, NewUser, PasswordResetToken, RefreshToken, Revocation,
    User,
};
use session_core::error::DomainError;
use session_core::traits::{RepoResult, SessionStore, SessionTx, UserRepository};
use session_core::value_objects::{PasswordResetId, RefreshTokenId, Role, UserId};

#[derive(Debug, Clone)]
struct UserRow {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, UserRow>,
    refresh_tokens: BTreeMap<RefreshTokenId, RefreshToken>,
    password_resets: BTreeMap<PasswordResetId, PasswordResetToken>,
    last_user_id: i64,
    last_refresh_id: i64,
    last_reset_id: i64,
}

impl Tables {
    fn user_mut(&mut self, id: UserId) -> RepoResult<&mut UserRow> {
        self.users.get_mut(&id).ok_or(DomainError::UserNotFound(id))
    }

    fn refresh_by_hash(&self, token_hash: &str) -> Option<&RefreshToken> {
        self.refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
    }

    fn revoke_where<F>(&mut self, revocation: &Revocation, predicate: F) -> u64
    where
        F: Fn(&RefreshToken) -> bool,
    {
        let mut revoked = 0;
        for token in self.refresh_tokens.values_mut() {
            if !token.is_revoked && predicate(token) {
                token.is_revoked = true;
                token.revoked_at = Some(revocation.at);
                token.revoked_by = Some(revocation.actor);
                revoked += 1;
            }
        }
        revoked
    }
}

/// In-memory implementation of `UserRepository` and `SessionStore`
#[derive(Clone, Default)]
pub struct MemoryStore {
    committed: Arc<RwLock<Tables>>,
    writer: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        let tables = self.committed.read().await;
        Ok(tables.users.get(&id).map(|row| row.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let tables = self.committed.read().await;
        Ok(tables
            .users
            .values()
            .find(|row| row.user.email == email)
            .map(|row| row.user.clone()))
    }

    async fn email_exists(&self, email: &str) -> RepoResult<bool> {
        Ok(self.find_by_email(email).await?.is_some())
    }

    #[instrument(skip(self, user), fields(email = %user.email, role = %user.role))]
    async fn create(&self, user: &NewUser) -> RepoResult<User> {
        let _writer = self.writer.lock().await;
        let mut tables = self.committed.write().await;

        if tables.users.values().any(|row| row.user.email == user.email) {
            return Err(DomainError::EmailAlreadyExists);
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: UserId::new(tables.last_user_id),
            email: user.email.clone(),
            role: user.role,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };

        tables.users.insert(
            created.id,
            UserRow {
                user: created.clone(),
                password_hash: user.password_hash.clone(),
            },
        );

        Ok(created)
    }

    async fn get_password_hash(&self, id: UserId) -> RepoResult<Option<String>> {
        let tables = self.committed.read().await;
        Ok(tables.users.get(&id).map(|row| row.password_hash.clone()))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn begin(&self) -> RepoResult<Box<dyn SessionTx>> {
        let guard = Arc::clone(&self.writer).lock_owned().await;
        let staged = self.committed.read().await.clone();

        Ok(Box::new(MemoryTx {
            committed: Arc::clone(&self.committed),
            staged,
            _writer: guard,
        }))
    }

    async fn find_refresh_token(&self, token_hash: &str) -> RepoResult<Option<RefreshToken>> {
        let tables = self.committed.read().await;
        Ok(tables.refresh_by_hash(token_hash).cloned())
    }

    async fn find_password_reset(
        &self,
        token_hash: &str,
    ) -> RepoResult<Option<PasswordResetToken>> {
        let tables = self.committed.read().await;
        Ok(tables
            .password_resets
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned())
    }

    async fn list_refresh_tokens(&self, user_id: UserId) -> RepoResult<Vec<RefreshToken>> {
        let tables = self.committed.read().await;
        Ok(tables
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn count_active_refresh_tokens(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let tables = self.committed.read().await;
        Ok(tables
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id && t.is_active_at(now))
            .count() as u64)
    }
}

/// Exclusive unit of work over a private copy of the tables
pub struct MemoryTx {
    committed: Arc<RwLock<Tables>>,
    staged: Tables,
    _writer: OwnedMutexGuard<()>,
}

#[async_trait]
impl SessionTx for MemoryTx {
    async fn lock_user(&mut self, id: UserId) -> RepoResult<Option<User>> {
        Ok(self.staged.users.get(&id).map(|row| row.user.clone()))
    }

    async fn password_hash(&mut self, id: UserId) -> RepoResult<Option<String>> {
        Ok(self
            .staged
            .users
            .get(&id)
            .map(|row| row.password_hash.clone()))
    }

    async fn update_account_flags(
        &mut self,
        id: UserId,
        is_active: bool,
        is_deleted: bool,
    ) -> RepoResult<()> {
        let row = self.staged.user_mut(id)?;
        row.user.is_active = is_active;
        row.user.is_deleted = is_deleted;
        row.user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_role(&mut self, id: UserId, role: Role) -> RepoResult<()> {
        let row = self.staged.user_mut(id)?;
        row.user.role = role;
        row.user.updated_at = Utc::now();
        Ok(())
    }

    async fn update_password_hash(&mut self, id: UserId, password_hash: &str) -> RepoResult<()> {
        let row = self.staged.user_mut(id)?;
        row.password_hash = password_hash.to_string();
        row.user.updated_at = Utc::now();
        Ok(())
    }

    async fn lock_refresh_token(&mut self, token_hash: &str) -> RepoResult<Option<RefreshToken>> {
        Ok(self.staged.refresh_by_hash(token_hash).cloned())
    }

    async fn count_other_active_refresh_tokens(
        &mut self,
        user_id: UserId,
        except: RefreshTokenId,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        Ok(self
            .staged
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id && t.id != except && t.is_active_at(now))
            .count() as u64)
    }

    async fn insert_refresh_token(&mut self, token: &NewRefreshToken) -> RepoResult<RefreshToken> {
        if self.staged.refresh_by_hash(&token.token_hash).is_some() {
            return Err(DomainError::TokenHashCollision);
        }

        self.staged.last_refresh_id += 1;
        let record = RefreshToken {
            id: RefreshTokenId::new(self.staged.last_refresh_id),
            user_id: token.user_id,
            token_hash: token.token_hash.clone(),
            expires_at: token.expires_at,
            created_at: Utc::now(),
            is_revoked: false,
            revoked_at: None,
            revoked_by: None,
        };

        self.staged.refresh_tokens.insert(record.id, record.clone());
        Ok(record)
    }

    async fn revoke_refresh_token(
        &mut self,
        id: RefreshTokenId,
        revocation: &Revocation,
    ) -> RepoResult<bool> {
        Ok(self.staged.revoke_where(revocation, |t| t.id == id) == 1)
    }

    async fn revoke_active_refresh_tokens(
        &mut self,
        user_id: UserId,
        revocation: &Revocation,
    ) -> RepoResult<u64> {
        let at = revocation.at;
        Ok(self
            .staged
            .revoke_where(revocation, |t| t.user_id == user_id && !t.is_expired_at(at)))
    }

    async fn revoke_all_refresh_tokens(
        &mut self,
        user_id: UserId,
        revocation: &Revocation,
    ) -> RepoResult<u64> {
        Ok(self
            .staged
            .revoke_where(revocation, |t| t.user_id == user_id))
    }

    async fn lock_password_reset(
        &mut self,
        token_hash: &str,
    ) -> RepoResult<Option<PasswordResetToken>> {
        Ok(self
            .staged
            .password_resets
            .values()
            .find(|r| r.token_hash == token_hash)
            .cloned())
    }

    async fn revoke_open_password_resets(&mut self, user_id: UserId) -> RepoResult<u64> {
        let mut revoked = 0;
        for reset in self.staged.password_resets.values_mut() {
            if reset.user_id == user_id && !reset.is_used() && !reset.is_revoked {
                reset.is_revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn insert_password_reset(
        &mut self,
        token: &NewPasswordResetToken,
    ) -> RepoResult<PasswordResetToken> {
        if self
            .staged
            .password_resets
            .values()
            .any(|r| r.token_hash == token.token_hash)
        {
            return Err(DomainError::TokenHashCollision);
        }

        self.staged.last_reset_id += 1;
        let record = PasswordResetToken {
            id: PasswordResetId::new(self.staged.last_reset_id),
            user_id: token.user_id,
            token_hash: token.token_hash.clone(),
            expires_at: token.expires_at,
            used_at: None,
            is_revoked: false,
            created_at: Utc::now(),
        };

        self.staged.password_resets.insert(record.id, record.clone());
        Ok(record)
    }

    async fn mark_password_reset_used(
        &mut self,
        id: PasswordResetId,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        match self.staged.password_resets.get_mut(&id) {
            Some(reset) if reset.used_at.is_none() => {
                reset.used_at = Some(at);
                Ok(())
            }
            _ => Err(DomainError::ValidationError(format!(
                "password reset {id} is already used"
            ))),
        }
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let this = *self;
        *this.committed.write().await = this.staged;
        // writer guard released here
        Ok(())
    }
}
