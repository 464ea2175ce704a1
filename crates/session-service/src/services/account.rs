//! Account status propagation
//!
//! Self-service and admin status changes. Each one commits the new account
//! state and the revocation of the account's sessions in one transaction,
//! so no session outlives the change that was meant to end it.

use session_common::{validate_password_policy, AppError};
use session_core::entities::User;
use session_core::error::DomainError;
use session_core::events::{AccountChange, AccountEvent};
use session_core::traits::SessionTx;
use session_core::value_objects::{Role, UserId};
use tracing::{debug, info, instrument, warn};

use crate::dto::{AdminResetPasswordRequest, ChangeRoleRequest, SetActiveRequest};

use super::context::ServiceContext;
use super::credentials::CredentialService;
use super::error::{ServiceError, ServiceResult};
use super::ledger::RefreshTokenLedger;

/// Account status service
pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    // === Self-service ===

    /// Deactivate the caller's own account
    #[instrument(skip(self))]
    pub async fn deactivate(&self, user_id: UserId) -> ServiceResult<AccountChange> {
        let mut tx = self.ctx.sessions().begin().await?;
        let user = lock_target(tx.as_mut(), user_id).await?;
        ensure_not_deleted(&user)?;
        ensure_not_protected(&user, "deactivated")?;

        tx.update_account_flags(user.id, false, false).await?;
        self.finish(tx, user.id, user.id, AccountEvent::Deactivated)
            .await
    }

    /// Soft-delete the caller's own account
    #[instrument(skip(self))]
    pub async fn soft_delete(&self, user_id: UserId) -> ServiceResult<AccountChange> {
        let mut tx = self.ctx.sessions().begin().await?;
        let user = lock_target(tx.as_mut(), user_id).await?;
        ensure_not_deleted(&user)?;
        ensure_not_protected(&user, "deleted")?;

        tx.update_account_flags(user.id, false, true).await?;
        self.finish(tx, user.id, user.id, AccountEvent::Deleted).await
    }

    // === Admin actions ===

    /// Deactivate or reactivate another account
    #[instrument(skip(self))]
    pub async fn set_active(
        &self,
        admin_id: UserId,
        target_id: UserId,
        request: SetActiveRequest,
    ) -> ServiceResult<AccountChange> {
        let admin = self.ensure_admin(admin_id).await?;

        let mut tx = self.ctx.sessions().begin().await?;
        let target = lock_target(tx.as_mut(), target_id).await?;
        ensure_not_protected(&target, "deactivated or reactivated")?;
        ensure_not_deleted(&target)?;

        tx.update_account_flags(target.id, request.is_active, false)
            .await?;
        let event = if request.is_active {
            AccountEvent::Reactivated
        } else {
            AccountEvent::Deactivated
        };
        self.finish(tx, target.id, admin.id, event).await
    }

    /// Soft-delete another account
    #[instrument(skip(self))]
    pub async fn soft_delete_by_admin(
        &self,
        admin_id: UserId,
        target_id: UserId,
    ) -> ServiceResult<AccountChange> {
        let admin = self.ensure_admin(admin_id).await?;

        let mut tx = self.ctx.sessions().begin().await?;
        let target = lock_target(tx.as_mut(), target_id).await?;
        ensure_not_protected(&target, "deleted")?;
        ensure_not_deleted(&target)?;

        tx.update_account_flags(target.id, false, true).await?;
        self.finish(tx, target.id, admin.id, AccountEvent::Deleted)
            .await
    }

    /// Change another account's role. Live sessions carry the old role in
    /// their claims, so they are revoked.
    #[instrument(skip(self))]
    pub async fn change_role(
        &self,
        admin_id: UserId,
        target_id: UserId,
        request: ChangeRoleRequest,
    ) -> ServiceResult<AccountChange> {
        let admin = self.ensure_admin(admin_id).await?;

        let mut tx = self.ctx.sessions().begin().await?;
        let target = lock_target(tx.as_mut(), target_id).await?;
        if self.ctx.accounts().is_primary_admin(&target.email) {
            warn!(admin_id = %admin.id, target_id = %target.id, "Refused to change the primary admin's role");
            return Err(AppError::forbidden("the primary admin's role cannot be changed").into());
        }
        ensure_not_deleted(&target)?;

        let event = AccountEvent::RoleChanged {
            from: target.role,
            to: request.role,
        };
        if target.role == request.role {
            debug!(target_id = %target.id, "Role unchanged");
            return Ok(AccountChange {
                user_id: target.id,
                event,
                sessions_revoked: 0,
            });
        }

        tx.update_role(target.id, request.role).await?;
        self.finish(tx, target.id, admin.id, event).await
    }

    /// Set another account's password and end all of its sessions
    #[instrument(skip(self, request))]
    pub async fn admin_reset_password(
        &self,
        admin_id: UserId,
        target_id: UserId,
        request: AdminResetPasswordRequest,
    ) -> ServiceResult<AccountChange> {
        let admin = self.ensure_admin(admin_id).await?;
        if admin.id == target_id {
            return Err(AppError::forbidden(
                "admins must use the password reset flow for their own account",
            )
            .into());
        }

        let mut tx = self.ctx.sessions().begin().await?;
        let target = lock_target(tx.as_mut(), target_id).await?;
        ensure_not_deleted(&target)?;
        validate_password_policy(&request.new_password)?;

        let password_hash = self.ctx.password_hasher().hash(&request.new_password)?;
        tx.update_password_hash(target.id, &password_hash).await?;
        self.finish(tx, target.id, admin.id, AccountEvent::PasswordReset)
            .await
    }

    /// Create the primary admin account unless it already exists
    #[instrument(skip(self, password))]
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> ServiceResult<User> {
        let credentials = CredentialService::new(self.ctx);

        if let Some(existing) = credentials.find_by_email(email).await? {
            debug!(user_id = %existing.id, "Admin account already present");
            return Ok(existing);
        }

        match credentials.create_account(email, password, Role::Admin).await {
            Ok(user) => {
                info!(user_id = %user.id, "Bootstrapped admin account");
                Ok(user)
            }
            // lost a race with another bootstrapper
            Err(e @ ServiceError::Domain(DomainError::EmailAlreadyExists)) => {
                credentials.find_by_email(email).await?.ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    // === Helpers ===

    /// Admin actions require a live admin account. Read without a lock so
    /// two admins acting on each other never wait on each other's rows.
    async fn ensure_admin(&self, admin_id: UserId) -> ServiceResult<User> {
        match self.ctx.users().find_by_id(admin_id).await? {
            Some(admin) if admin.role.is_admin() && admin.can_authenticate() => Ok(admin),
            _ => {
                warn!(admin_id = %admin_id, "Admin action refused: caller is not a live admin");
                Err(AppError::forbidden("admin role required").into())
            }
        }
    }

    /// Revoke the target's sessions when the event calls for it, then commit
    async fn finish(
        &self,
        mut tx: Box<dyn SessionTx>,
        target: UserId,
        actor: UserId,
        event: AccountEvent,
    ) -> ServiceResult<AccountChange> {
        let sessions_revoked = if event.revokes_sessions() {
            RefreshTokenLedger::new(self.ctx)
                .revoke_all_in(tx.as_mut(), target, actor)
                .await?
        } else {
            0
        };
        tx.commit().await?;

        info!(user_id = %target, actor = %actor, event = ?event, sessions_revoked, "Account changed");

        Ok(AccountChange {
            user_id: target,
            event,
            sessions_revoked,
        })
    }
}

async fn lock_target(tx: &mut dyn SessionTx, id: UserId) -> ServiceResult<User> {
    let user = tx
        .lock_user(id)
        .await?
        .ok_or(DomainError::UserNotFound(id))?;
    Ok(user)
}

fn ensure_not_deleted(user: &User) -> Result<(), AppError> {
    if user.is_deleted {
        return Err(AppError::AccountDeleted);
    }
    Ok(())
}

fn ensure_not_protected(user: &User, action: &str) -> Result<(), AppError> {
    if user.is_protected() {
        warn!(user_id = %user.id, action, "Refused to change a protected admin account");
        return Err(AppError::forbidden(format!(
            "administrator accounts cannot be {action}"
        )));
    }
    Ok(())
}
