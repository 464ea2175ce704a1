//! PostgreSQL implementation of SessionStore
//!
//! Each `SessionTx` is one database transaction. Row locks are taken with
//! `SELECT ... FOR UPDATE`, user row first, so two transactions on the same
//! account queue up behind each other and the second one re-reads the rows
//! the first one committed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use session_core::entities::{
    NewPasswordResetToken, NewRefreshToken, PasswordResetToken, RefreshToken, Revocation, User,
};
use session_core::error::DomainError;
use session_core::traits::{RepoResult, SessionStore, SessionTx};
use session_core::value_objects::{PasswordResetId, RefreshTokenId, Role, UserId};

use crate::models::{PasswordResetModel, RefreshTokenModel, UserModel};

use super::error::{map_db_error, map_unique_violation, to_count, user_not_found};
use super::user::USER_COLUMNS;

const REFRESH_COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at, is_revoked, \
                               revoked_at, revoked_by_user_id";

const RESET_COLUMNS: &str = "id, user_id, token_hash, expires_at, used_at, is_revoked, created_at";

/// PostgreSQL implementation of SessionStore
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Create a new PgSessionStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> RepoResult<Box<dyn SessionTx>> {
        let tx = self.pool.begin().await.map_err(map_db_error)?;
        Ok(Box::new(PgSessionTx { tx }))
    }

    #[instrument(skip_all)]
    async fn find_refresh_token(&self, token_hash: &str) -> RepoResult<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshTokenModel>(&format!(
            "SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(RefreshToken::from))
    }

    #[instrument(skip_all)]
    async fn find_password_reset(
        &self,
        token_hash: &str,
    ) -> RepoResult<Option<PasswordResetToken>> {
        let result = sqlx::query_as::<_, PasswordResetModel>(&format!(
            "SELECT {RESET_COLUMNS} FROM password_reset_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(PasswordResetToken::from))
    }

    #[instrument(skip(self))]
    async fn list_refresh_tokens(&self, user_id: UserId) -> RepoResult<Vec<RefreshToken>> {
        let rows = sqlx::query_as::<_, RefreshTokenModel>(&format!(
            "SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE user_id = $1 ORDER BY id ASC"
        ))
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(rows.into_iter().map(RefreshToken::from).collect())
    }

    #[instrument(skip(self))]
    async fn count_active_refresh_tokens(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM refresh_tokens
            WHERE user_id = $1 AND NOT is_revoked AND expires_at > $2
            ",
        )
        .bind(user_id.into_inner())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(to_count(count))
    }
}

/// One open PostgreSQL transaction. Dropping it rolls back.
pub struct PgSessionTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SessionTx for PgSessionTx {
    // =========================================================================
    // Accounts
    // =========================================================================

    #[instrument(skip(self))]
    async fn lock_user(&mut self, id: UserId) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.into_inner())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn password_hash(&mut self, id: UserId) -> RepoResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT password_hash FROM users WHERE id = $1")
            .bind(id.into_inner())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_db_error)
    }

    #[instrument(skip(self))]
    async fn update_account_flags(
        &mut self,
        id: UserId,
        is_active: bool,
        is_deleted: bool,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET is_active = $2, is_deleted = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .bind(is_active)
        .bind(is_deleted)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_role(&mut self, id: UserId, role: Role) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .bind(role.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password_hash(&mut self, id: UserId, password_hash: &str) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .bind(password_hash)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        Ok(())
    }

    // =========================================================================
    // Refresh tokens
    // =========================================================================

    #[instrument(skip_all)]
    async fn lock_refresh_token(&mut self, token_hash: &str) -> RepoResult<Option<RefreshToken>> {
        let result = sqlx::query_as::<_, RefreshTokenModel>(&format!(
            "SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE token_hash = $1 FOR UPDATE"
        ))
        .bind(token_hash)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(RefreshToken::from))
    }

    #[instrument(skip(self))]
    async fn count_other_active_refresh_tokens(
        &mut self,
        user_id: UserId,
        except: RefreshTokenId,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*) FROM refresh_tokens
            WHERE user_id = $1 AND id <> $2 AND NOT is_revoked AND expires_at > $3
            ",
        )
        .bind(user_id.into_inner())
        .bind(except.into_inner())
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(to_count(count))
    }

    #[instrument(skip_all, fields(user_id = %token.user_id))]
    async fn insert_refresh_token(&mut self, token: &NewRefreshToken) -> RepoResult<RefreshToken> {
        let model = sqlx::query_as::<_, RefreshTokenModel>(&format!(
            r"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {REFRESH_COLUMNS}
            "
        ))
        .bind(token.user_id.into_inner())
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::TokenHashCollision))?;

        Ok(RefreshToken::from(model))
    }

    #[instrument(skip(self))]
    async fn revoke_refresh_token(
        &mut self,
        id: RefreshTokenId,
        revocation: &Revocation,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $2, revoked_by_user_id = $3
            WHERE id = $1 AND NOT is_revoked
            ",
        )
        .bind(id.into_inner())
        .bind(revocation.at)
        .bind(revocation.actor.into_inner())
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn revoke_active_refresh_tokens(
        &mut self,
        user_id: UserId,
        revocation: &Revocation,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $2, revoked_by_user_id = $3
            WHERE user_id = $1 AND NOT is_revoked AND expires_at > $2
            ",
        )
        .bind(user_id.into_inner())
        .bind(revocation.at)
        .bind(revocation.actor.into_inner())
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn revoke_all_refresh_tokens(
        &mut self,
        user_id: UserId,
        revocation: &Revocation,
    ) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE refresh_tokens
            SET is_revoked = TRUE, revoked_at = $2, revoked_by_user_id = $3
            WHERE user_id = $1 AND NOT is_revoked
            ",
        )
        .bind(user_id.into_inner())
        .bind(revocation.at)
        .bind(revocation.actor.into_inner())
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    // =========================================================================
    // Password resets
    // =========================================================================

    #[instrument(skip_all)]
    async fn lock_password_reset(
        &mut self,
        token_hash: &str,
    ) -> RepoResult<Option<PasswordResetToken>> {
        let result = sqlx::query_as::<_, PasswordResetModel>(&format!(
            "SELECT {RESET_COLUMNS} FROM password_reset_tokens WHERE token_hash = $1 FOR UPDATE"
        ))
        .bind(token_hash)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(PasswordResetToken::from))
    }

    #[instrument(skip(self))]
    async fn revoke_open_password_resets(&mut self, user_id: UserId) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE password_reset_tokens
            SET is_revoked = TRUE
            WHERE user_id = $1 AND used_at IS NULL AND NOT is_revoked
            ",
        )
        .bind(user_id.into_inner())
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip_all, fields(user_id = %token.user_id))]
    async fn insert_password_reset(
        &mut self,
        token: &NewPasswordResetToken,
    ) -> RepoResult<PasswordResetToken> {
        let model = sqlx::query_as::<_, PasswordResetModel>(&format!(
            r"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING {RESET_COLUMNS}
            "
        ))
        .bind(token.user_id.into_inner())
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::TokenHashCollision))?;

        Ok(PasswordResetToken::from(model))
    }

    #[instrument(skip(self))]
    async fn mark_password_reset_used(
        &mut self,
        id: PasswordResetId,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE password_reset_tokens
            SET used_at = $2
            WHERE id = $1 AND used_at IS NULL
            ",
        )
        .bind(id.into_inner())
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ValidationError(format!(
                "password reset {id} is already used"
            )));
        }

        Ok(())
    }

    // =========================================================================
    // Completion
    // =========================================================================

    #[instrument(skip_all)]
    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let this = *self;
        this.tx.commit().await.map_err(map_db_error)
    }
}
