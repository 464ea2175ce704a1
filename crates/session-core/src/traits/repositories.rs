//! Repository traits (ports) - define the interface for data access
//!
//! These traits follow the Repository pattern from Domain-Driven Design.
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation.
//!
//! Anything that has to be atomic (rotation, login, status changes, password
//! resets) goes through a [`SessionTx`] obtained from [`SessionStore::begin`].
//! Implementations must guarantee that two transactions touching the same
//! user or the same token row cannot interleave: the second one observes the
//! first one's committed writes. A transaction dropped without `commit` rolls
//! back every change it staged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    NewPasswordResetToken, NewRefreshToken, NewUser, PasswordResetToken, RefreshToken, Revocation,
    User,
};
use crate::error::DomainError;
use crate::value_objects::{PasswordResetId, RefreshTokenId, Role, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

/// Point reads and creation of accounts.
///
/// Lookups return soft-deleted accounts as well; callers decide what a
/// deleted account means for them.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Find user by email
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    /// Check if email is already taken
    async fn email_exists(&self, email: &str) -> RepoResult<bool>;

    /// Create a new user
    async fn create(&self, user: &NewUser) -> RepoResult<User>;

    /// Get password hash for authentication
    async fn get_password_hash(&self, id: UserId) -> RepoResult<Option<String>>;
}

// ============================================================================
// Session Store
// ============================================================================

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Open a unit of work
    async fn begin(&self) -> RepoResult<Box<dyn SessionTx>>;

    /// Non-locking lookup of a refresh token by its keyed hash
    async fn find_refresh_token(&self, token_hash: &str) -> RepoResult<Option<RefreshToken>>;

    /// Non-locking lookup of a password reset record by its hash
    async fn find_password_reset(&self, token_hash: &str)
        -> RepoResult<Option<PasswordResetToken>>;

    /// Every refresh token record ever issued to a user, oldest first
    async fn list_refresh_tokens(&self, user_id: UserId) -> RepoResult<Vec<RefreshToken>>;

    /// Number of non-revoked, non-expired refresh tokens a user holds
    async fn count_active_refresh_tokens(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> RepoResult<u64>;
}

/// A single atomic unit of work against the session tables.
///
/// `lock_*` methods take a row lock held until commit or rollback. Callers
/// lock the user row before any token rows.
#[async_trait]
pub trait SessionTx: Send {
    // === Accounts ===

    async fn lock_user(&mut self, id: UserId) -> RepoResult<Option<User>>;

    async fn password_hash(&mut self, id: UserId) -> RepoResult<Option<String>>;

    async fn update_account_flags(
        &mut self,
        id: UserId,
        is_active: bool,
        is_deleted: bool,
    ) -> RepoResult<()>;

    async fn update_role(&mut self, id: UserId, role: Role) -> RepoResult<()>;

    async fn update_password_hash(&mut self, id: UserId, password_hash: &str) -> RepoResult<()>;

    // === Refresh tokens ===

    async fn lock_refresh_token(&mut self, token_hash: &str) -> RepoResult<Option<RefreshToken>>;

    /// Live (non-revoked, non-expired) records of `user_id` other than `except`
    async fn count_other_active_refresh_tokens(
        &mut self,
        user_id: UserId,
        except: RefreshTokenId,
        now: DateTime<Utc>,
    ) -> RepoResult<u64>;

    async fn insert_refresh_token(&mut self, token: &NewRefreshToken) -> RepoResult<RefreshToken>;

    /// Flip one record to revoked. Returns false if it was already revoked,
    /// in which case the existing audit fields are left untouched.
    async fn revoke_refresh_token(
        &mut self,
        id: RefreshTokenId,
        revocation: &Revocation,
    ) -> RepoResult<bool>;

    /// Revoke the user's non-revoked records that have not expired yet
    async fn revoke_active_refresh_tokens(
        &mut self,
        user_id: UserId,
        revocation: &Revocation,
    ) -> RepoResult<u64>;

    /// Revoke every non-revoked record of the user, expired or not
    async fn revoke_all_refresh_tokens(
        &mut self,
        user_id: UserId,
        revocation: &Revocation,
    ) -> RepoResult<u64>;

    // === Password resets ===

    async fn lock_password_reset(
        &mut self,
        token_hash: &str,
    ) -> RepoResult<Option<PasswordResetToken>>;

    /// Revoke every unused, unrevoked reset record of the user
    async fn revoke_open_password_resets(&mut self, user_id: UserId) -> RepoResult<u64>;

    async fn insert_password_reset(
        &mut self,
        token: &NewPasswordResetToken,
    ) -> RepoResult<PasswordResetToken>;

    async fn mark_password_reset_used(
        &mut self,
        id: PasswordResetId,
        at: DateTime<Utc>,
    ) -> RepoResult<()>;

    // === Completion ===

    async fn commit(self: Box<Self>) -> RepoResult<()>;
}
