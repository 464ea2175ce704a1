//! Authentication service
//!
//! Handles registration, login, token refresh, logout and per-request
//! authorization.

use serde::Serialize;
use session_common::AppError;
use session_core::entities::User;
use session_core::value_objects::{Role, UserId};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::{
    AuthResponse, CurrentUserResponse, LoginRequest, LogoutRequest, RefreshTokenRequest,
    RegisterRequest,
};

use super::context::ServiceContext;
use super::credentials::{ensure_can_authenticate, CredentialService};
use super::error::ServiceResult;
use super::ledger::{RefreshTokenLedger, RevokeOutcome};
use super::session_policy::supersede_prior_sessions;

/// Identity and role of a verified, live access token bearer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
}

/// What logout did. Every variant is a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogoutOutcome {
    Revoked,
    AlreadyRevoked,
    NotFound,
}

impl From<RevokeOutcome> for LogoutOutcome {
    fn from(outcome: RevokeOutcome) -> Self {
        match outcome {
            RevokeOutcome::Revoked => Self::Revoked,
            RevokeOutcome::AlreadyRevoked => Self::AlreadyRevoked,
        }
    }
}

/// Authentication service
pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    /// Create a new AuthService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a new account. Does not log it in.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<CurrentUserResponse> {
        request.validate()?;

        let user = CredentialService::new(self.ctx)
            .register(&request.email, &request.password)
            .await?;

        Ok(CurrentUserResponse::from(&user))
    }

    /// Login with email and password.
    ///
    /// Every live session of the account is revoked in the same transaction
    /// that stores the new refresh token.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        request.validate()?;

        let user = CredentialService::new(self.ctx)
            .verify_credentials(&request.email, &request.password)
            .await?;

        let mut tx = self.ctx.sessions().begin().await?;
        // re-read under lock: the account may have changed since the check
        let user = tx
            .lock_user(user.id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        ensure_can_authenticate(&user)?;

        let superseded = supersede_prior_sessions(tx.as_mut(), user.id).await?;
        let refresh = RefreshTokenLedger::new(self.ctx)
            .issue_in(tx.as_mut(), user.id)
            .await?;
        let access = self.ctx.access_tokens().issue(&user)?;
        tx.commit().await?;

        info!(user_id = %user.id, superseded, "User logged in");

        Ok(AuthResponse::new(
            access.token,
            refresh.raw,
            access.expires_in,
            CurrentUserResponse::from(&user),
        ))
    }

    /// Rotate a refresh token into a new token pair
    #[instrument(skip_all)]
    pub async fn refresh(&self, request: RefreshTokenRequest) -> ServiceResult<AuthResponse> {
        request.validate()?;

        let pair = RefreshTokenLedger::new(self.ctx)
            .rotate(&request.refresh_token)
            .await?;

        Ok(AuthResponse::from(pair))
    }

    /// Revoke the caller's refresh token.
    ///
    /// Unknown and already revoked tokens are not errors. A token that
    /// belongs to another account is refused.
    #[instrument(skip(self, request))]
    pub async fn logout(
        &self,
        caller: UserId,
        request: LogoutRequest,
    ) -> ServiceResult<LogoutOutcome> {
        request.validate()?;

        let token_hash = self.ctx.refresh_hasher().hash(&request.refresh_token)?;
        let Some(record) = self.ctx.sessions().find_refresh_token(&token_hash).await? else {
            info!(user_id = %caller, "Logout with unknown token");
            return Ok(LogoutOutcome::NotFound);
        };

        if record.user_id != caller {
            warn!(user_id = %caller, owner = %record.user_id, "Logout refused: token owned by another account");
            return Err(AppError::forbidden("refresh token belongs to another account").into());
        }

        let outcome = RefreshTokenLedger::new(self.ctx)
            .revoke(record.id, caller)
            .await?;

        info!(user_id = %caller, outcome = ?outcome, "User logged out");
        Ok(outcome.into())
    }

    /// Verify an access token and re-check that its account is still live.
    ///
    /// A token minted before a deactivation, deletion or role change stops
    /// authorizing as soon as the change is committed.
    #[instrument(skip_all)]
    pub async fn authorize(&self, access_token: &str) -> ServiceResult<Principal> {
        let user = self.live_user(access_token).await?;

        Ok(Principal {
            user_id: user.id,
            email: user.email,
            role: user.role,
        })
    }

    /// The bearer's account
    pub async fn current_user(&self, access_token: &str) -> ServiceResult<CurrentUserResponse> {
        let user = self.live_user(access_token).await?;
        Ok(CurrentUserResponse::from(&user))
    }

    async fn live_user(&self, access_token: &str) -> ServiceResult<User> {
        let claims = self.ctx.access_tokens().verify(access_token)?;
        let user_id = claims.user_id()?;

        let user = CredentialService::new(self.ctx)
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        ensure_can_authenticate(&user)?;

        if user.role != claims.role {
            warn!(user_id = %user.id, claimed = %claims.role, actual = %user.role, "Stale role claim");
            return Err(AppError::TokenInvalid.into());
        }

        Ok(user)
    }
}
