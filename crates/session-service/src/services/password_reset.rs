//! Password reset flow
//!
//! Reset secrets are single-use, short-lived and independent of refresh
//! tokens. Only their SHA-256 hash is stored. Consuming one replaces the
//! password and revokes every session of the account.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use session_common::{generate_secret, hash_reset_token, validate_password_policy, AppError};
use session_core::entities::{NewPasswordResetToken, User};
use session_core::events::{AccountChange, AccountEvent};
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use crate::dto::{ForgotPasswordRequest, ForgotPasswordResponse, ResetPasswordRequest};

use super::context::ServiceContext;
use super::credentials::normalize_email;
use super::error::ServiceResult;
use super::ledger::RefreshTokenLedger;

/// Out-of-band channel (mail, SMS, ...) for reset secrets in production
#[async_trait]
pub trait ResetTokenDelivery: Send + Sync {
    async fn deliver(
        &self,
        user: &User,
        raw_token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

/// Password reset service
pub struct PasswordResetService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PasswordResetService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Issue a reset secret if the email belongs to a live account.
    ///
    /// The response is the same whether or not it does. Outside production
    /// it carries the raw secret; in production the secret goes to the
    /// configured delivery channel instead.
    #[instrument(skip_all)]
    pub async fn request(&self, request: ForgotPasswordRequest) -> ServiceResult<ForgotPasswordResponse> {
        let email = normalize_email(&request.email);

        let Some(user) = self.ctx.users().find_by_email(&email).await? else {
            debug!("Password reset requested for unknown email");
            return Ok(ForgotPasswordResponse::generic());
        };

        let mut tx = self.ctx.sessions().begin().await?;
        let user = match tx.lock_user(user.id).await? {
            Some(user) if user.can_authenticate() => user,
            _ => {
                debug!(user_id = %user.id, "Password reset requested for inactive account");
                return Ok(ForgotPasswordResponse::generic());
            }
        };

        let superseded = tx.revoke_open_password_resets(user.id).await?;

        let raw = generate_secret();
        let expires_at = Utc::now() + self.ctx.password_reset_ttl();
        tx.insert_password_reset(&NewPasswordResetToken {
            user_id: user.id,
            token_hash: hash_reset_token(&raw),
            expires_at,
        })
        .await?;
        tx.commit().await?;

        info!(user_id = %user.id, superseded, "Password reset issued");

        if !self.ctx.environment().is_production() {
            return Ok(ForgotPasswordResponse::with_token(raw, expires_at));
        }

        match self.ctx.reset_delivery() {
            Some(delivery) => {
                if let Err(e) = delivery.deliver(&user, &raw, expires_at).await {
                    error!(user_id = %user.id, error = %e, "Failed to deliver password reset");
                }
            }
            None => warn!(user_id = %user.id, "No reset delivery configured; secret dropped"),
        }

        Ok(ForgotPasswordResponse::generic())
    }

    /// Consume a reset secret and set a new password.
    ///
    /// Fails with `TokenInvalid` for an unknown, used, revoked or expired
    /// secret and for a deleted or disabled account. On any failure the
    /// secret stays usable.
    #[instrument(skip_all)]
    pub async fn consume(&self, request: ResetPasswordRequest) -> ServiceResult<AccountChange> {
        request.validate()?;

        let token_hash = hash_reset_token(&request.token);
        let Some(found) = self.ctx.sessions().find_password_reset(&token_hash).await? else {
            warn!("Password reset rejected: unknown token");
            return Err(AppError::TokenInvalid.into());
        };

        let mut tx = self.ctx.sessions().begin().await?;
        let user = tx
            .lock_user(found.user_id)
            .await?
            .ok_or(AppError::TokenInvalid)?;
        let reset = tx
            .lock_password_reset(&token_hash)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        let now = Utc::now();
        if !reset.is_consumable_at(now) {
            warn!(
                user_id = %user.id,
                used = reset.is_used(),
                revoked = reset.is_revoked,
                "Password reset rejected: token not consumable"
            );
            return Err(AppError::TokenInvalid.into());
        }
        if !user.can_authenticate() {
            warn!(user_id = %user.id, "Password reset rejected: account not active");
            return Err(AppError::TokenInvalid.into());
        }

        validate_password_policy(&request.new_password)?;

        let hasher = self.ctx.password_hasher();
        let current = tx.password_hash(user.id).await?.unwrap_or_default();
        if hasher.verify(&request.new_password, &current)? {
            return Err(AppError::PasswordUnchanged.into());
        }

        let new_hash = hasher.hash(&request.new_password)?;
        tx.update_password_hash(user.id, &new_hash).await?;
        tx.mark_password_reset_used(reset.id, now).await?;
        let sessions_revoked = RefreshTokenLedger::new(self.ctx)
            .revoke_all_in(tx.as_mut(), user.id, user.id)
            .await?;
        tx.commit().await?;

        info!(user_id = %user.id, sessions_revoked, "Password reset completed");

        Ok(AccountChange {
            user_id: user.id,
            event: AccountEvent::PasswordReset,
            sessions_revoked,
        })
    }
}
