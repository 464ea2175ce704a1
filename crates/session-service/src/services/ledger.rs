//! Refresh token ledger
//!
//! Issues, rotates and revokes refresh tokens. Only the keyed hash of a
//! token is stored; the raw secret is handed out once at issue time.
//!
//! Rotation runs inside one transaction that locks the owner's row and then
//! the presented token's row. A second rotation with the same secret waits
//! on those locks, re-reads the committed record and fails with
//! `TokenRevoked`.

use chrono::Utc;
use serde::Serialize;
use session_common::{generate_secret, AppError, IssuedAccessToken};
use session_core::entities::{NewRefreshToken, RefreshToken, Revocation, User};
use session_core::error::DomainError;
use session_core::traits::SessionTx;
use session_core::value_objects::{RefreshTokenId, UserId};
use tracing::{info, instrument, warn};

use super::context::ServiceContext;
use super::credentials::ensure_can_authenticate;
use super::error::ServiceResult;
use super::session_policy::ensure_single_session;

/// A freshly stored refresh token and its raw secret
#[derive(Debug, Clone)]
pub struct IssuedRefreshToken {
    pub raw: String,
    pub record: RefreshToken,
}

/// Access and refresh token handed out together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedAccessToken,
    pub refresh_token: String,
    pub user: User,
}

/// Result of revoking a single record; both are success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevokeOutcome {
    Revoked,
    AlreadyRevoked,
}

/// Refresh token ledger service
pub struct RefreshTokenLedger<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RefreshTokenLedger<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Store a new refresh token for `user_id` inside an open transaction
    pub async fn issue_in(
        &self,
        tx: &mut dyn SessionTx,
        user_id: UserId,
    ) -> ServiceResult<IssuedRefreshToken> {
        let raw = generate_secret();
        let token_hash = self.ctx.refresh_hasher().hash(&raw)?;

        let record = tx
            .insert_refresh_token(&NewRefreshToken {
                user_id,
                token_hash,
                expires_at: Utc::now() + self.ctx.refresh_token_ttl(),
            })
            .await?;

        Ok(IssuedRefreshToken { raw, record })
    }

    /// Store a new refresh token for `user_id` in its own transaction
    #[instrument(skip(self))]
    pub async fn issue(&self, user_id: UserId) -> ServiceResult<IssuedRefreshToken> {
        let mut tx = self.ctx.sessions().begin().await?;
        tx.lock_user(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;

        let issued = self.issue_in(tx.as_mut(), user_id).await?;
        tx.commit().await?;

        info!(user_id = %user_id, token_id = %issued.record.id, "Refresh token issued");
        Ok(issued)
    }

    /// Exchange a refresh token for a new access/refresh pair.
    ///
    /// The presented record is revoked and its successor stored in the same
    /// transaction; on any failure neither change is visible.
    #[instrument(skip_all)]
    pub async fn rotate(&self, raw: &str) -> ServiceResult<TokenPair> {
        let token_hash = self.ctx.refresh_hasher().hash(raw)?;

        // unlocked read to learn whose row to lock first
        let Some(found) = self.ctx.sessions().find_refresh_token(&token_hash).await? else {
            warn!("Refresh rejected: unknown token");
            return Err(AppError::TokenNotFound.into());
        };

        let mut tx = self.ctx.sessions().begin().await?;
        let user = tx
            .lock_user(found.user_id)
            .await?
            .ok_or(DomainError::UserNotFound(found.user_id))?;
        let record = tx
            .lock_refresh_token(&token_hash)
            .await?
            .ok_or(AppError::TokenNotFound)?;

        let now = Utc::now();
        if record.is_revoked {
            warn!(
                user_id = %user.id,
                token_id = %record.id,
                revoked_by = ?record.revoked_by,
                "Refresh rejected: revoked token presented"
            );
            return Err(AppError::TokenRevoked.into());
        }
        if record.is_expired_at(now) {
            info!(user_id = %user.id, token_id = %record.id, "Refresh rejected: token expired");
            return Err(AppError::TokenExpired.into());
        }

        ensure_single_session(tx.as_mut(), user.id, record.id, now).await?;
        ensure_can_authenticate(&user)?;

        tx.revoke_refresh_token(record.id, &Revocation { actor: user.id, at: now })
            .await?;
        let issued = self.issue_in(tx.as_mut(), user.id).await?;
        let access = self.ctx.access_tokens().issue(&user)?;
        tx.commit().await?;

        info!(
            user_id = %user.id,
            revoked = %record.id,
            issued = %issued.record.id,
            "Refresh token rotated"
        );

        Ok(TokenPair {
            access,
            refresh_token: issued.raw,
            user,
        })
    }

    /// Revoke one record. Revoking an already revoked record succeeds and
    /// leaves its original audit fields in place.
    #[instrument(skip(self))]
    pub async fn revoke(
        &self,
        record_id: RefreshTokenId,
        actor: UserId,
    ) -> ServiceResult<RevokeOutcome> {
        let mut tx = self.ctx.sessions().begin().await?;
        let revoked = tx
            .revoke_refresh_token(record_id, &Revocation::now_by(actor))
            .await?;
        tx.commit().await?;

        if revoked {
            info!(token_id = %record_id, actor = %actor, "Refresh token revoked");
            Ok(RevokeOutcome::Revoked)
        } else {
            Ok(RevokeOutcome::AlreadyRevoked)
        }
    }

    /// Revoke every non-revoked record of the user in its own transaction
    #[instrument(skip(self))]
    pub async fn revoke_all_for_user(&self, user_id: UserId, actor: UserId) -> ServiceResult<u64> {
        let mut tx = self.ctx.sessions().begin().await?;
        tx.lock_user(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;

        let revoked = self.revoke_all_in(tx.as_mut(), user_id, actor).await?;
        tx.commit().await?;
        Ok(revoked)
    }

    /// Revoke every non-revoked record of the user inside an open transaction
    pub async fn revoke_all_in(
        &self,
        tx: &mut dyn SessionTx,
        user_id: UserId,
        actor: UserId,
    ) -> ServiceResult<u64> {
        let revoked = tx
            .revoke_all_refresh_tokens(user_id, &Revocation::now_by(actor))
            .await?;

        info!(user_id = %user_id, actor = %actor, revoked, "Revoked all sessions");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use session_common::SessionConfig;
    use session_core::traits::SessionStore;

    use crate::services::testing::{builder, context, register, session_config, PASSWORD};

    #[tokio::test]
    async fn test_issue_stores_only_the_hash() {
        let ctx = context();
        let user = register(&ctx, "erin@example.com", PASSWORD).await;
        let ledger = RefreshTokenLedger::new(&ctx);

        let issued = ledger.issue(user.id).await.unwrap();
        assert_ne!(issued.record.token_hash, issued.raw);
        assert_eq!(
            issued.record.token_hash,
            ctx.refresh_hasher().hash(&issued.raw).unwrap()
        );
        assert!(issued.record.is_active_at(Utc::now()));
        assert!(issued.record.expires_at > Utc::now() + Duration::days(6));
    }

    #[tokio::test]
    async fn test_rotate_replaces_the_token() {
        let ctx = context();
        let user = register(&ctx, "erin@example.com", PASSWORD).await;
        let ledger = RefreshTokenLedger::new(&ctx);
        let first = ledger.issue(user.id).await.unwrap();

        let pair = ledger.rotate(&first.raw).await.unwrap();
        assert_ne!(pair.refresh_token, first.raw);
        assert_eq!(pair.user.id, user.id);
        assert_eq!(pair.access.claims.sub, user.id.to_string());

        let err = ledger.rotate(&first.raw).await.unwrap_err();
        assert!(matches!(err.as_app(), Some(AppError::TokenRevoked)));

        let records = ctx.sessions().list_refresh_tokens(user.id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].revoked_by, Some(user.id));
        assert!(records[1].is_active_at(Utc::now()));
    }

    #[tokio::test]
    async fn test_rotate_unknown_token() {
        let ctx = context();
        let err = RefreshTokenLedger::new(&ctx)
            .rotate("never-issued")
            .await
            .unwrap_err();
        assert!(matches!(err.as_app(), Some(AppError::TokenNotFound)));
    }

    #[tokio::test]
    async fn test_rotate_expired_token() {
        let ctx = builder()
            .session_config(SessionConfig {
                refresh_token_ttl: -1,
                ..session_config()
            })
            .build()
            .unwrap();
        let user = register(&ctx, "erin@example.com", PASSWORD).await;
        let ledger = RefreshTokenLedger::new(&ctx);
        let issued = ledger.issue(user.id).await.unwrap();

        let err = ledger.rotate(&issued.raw).await.unwrap_err();
        assert!(matches!(err.as_app(), Some(AppError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_rotate_refuses_duplicate_sessions() {
        let ctx = context();
        let user = register(&ctx, "erin@example.com", PASSWORD).await;
        let ledger = RefreshTokenLedger::new(&ctx);

        // issue() does not supersede, so this leaves two live records
        let first = ledger.issue(user.id).await.unwrap();
        ledger.issue(user.id).await.unwrap();

        let err = ledger.rotate(&first.raw).await.unwrap_err();
        assert!(matches!(err.as_app(), Some(AppError::SessionConflict)));

        // nothing changed
        let live = ctx
            .sessions()
            .count_active_refresh_tokens(user.id, Utc::now())
            .await
            .unwrap();
        assert_eq!(live, 2);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let ctx = context();
        let user = register(&ctx, "erin@example.com", PASSWORD).await;
        let admin = register(&ctx, "root@example.com", PASSWORD).await;
        let ledger = RefreshTokenLedger::new(&ctx);
        let issued = ledger.issue(user.id).await.unwrap();

        assert_eq!(
            ledger.revoke(issued.record.id, user.id).await.unwrap(),
            RevokeOutcome::Revoked
        );
        assert_eq!(
            ledger.revoke(issued.record.id, admin.id).await.unwrap(),
            RevokeOutcome::AlreadyRevoked
        );

        let stored = ctx
            .sessions()
            .find_refresh_token(&issued.record.token_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.revoked_by, Some(user.id));
    }

    #[tokio::test]
    async fn test_revoke_all_for_user() {
        let ctx = context();
        let user = register(&ctx, "erin@example.com", PASSWORD).await;
        let ledger = RefreshTokenLedger::new(&ctx);
        ledger.issue(user.id).await.unwrap();
        ledger.issue(user.id).await.unwrap();

        assert_eq!(ledger.revoke_all_for_user(user.id, user.id).await.unwrap(), 2);
        assert_eq!(ledger.revoke_all_for_user(user.id, user.id).await.unwrap(), 0);
    }
}
