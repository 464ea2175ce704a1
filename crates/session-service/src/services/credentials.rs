//! Credential store
//!
//! Account lookups, password verification and registration.

use session_common::{validate_password_policy, AppError};
use session_core::entities::{NewUser, Standing, User};
use session_core::error::DomainError;
use session_core::value_objects::{Role, UserId};
use tracing::{info, instrument, warn};
use validator::ValidateEmail;

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Emails are stored and compared trimmed and lowercased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Map a non-active account to the error its owner should see
pub(crate) fn ensure_can_authenticate(user: &User) -> Result<(), AppError> {
    match user.standing() {
        Standing::Active => Ok(()),
        Standing::Disabled => Err(AppError::AccountDisabled),
        Standing::Deleted => Err(AppError::AccountDeleted),
    }
}

/// Credential store service
pub struct CredentialService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> CredentialService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn find_by_id(&self, id: UserId) -> ServiceResult<Option<User>> {
        Ok(self.ctx.users().find_by_id(id).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(self
            .ctx
            .users()
            .find_by_email(&normalize_email(email))
            .await?)
    }

    /// Check an email/password pair.
    ///
    /// Unknown email and wrong password both fail with `InvalidCredentials`.
    /// Only a correct password learns whether the account is deleted or
    /// disabled.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> ServiceResult<User> {
        let hasher = self.ctx.password_hasher();

        let Some(user) = self.find_by_email(email).await? else {
            hasher.verify(password, self.ctx.decoy_hash()?)?;
            warn!("Credentials rejected: unknown email");
            return Err(AppError::InvalidCredentials.into());
        };

        let password_hash = self
            .ctx
            .users()
            .get_password_hash(user.id)
            .await?
            .unwrap_or_default();

        if !hasher.verify(password, &password_hash)? {
            warn!(user_id = %user.id, "Credentials rejected: wrong password");
            return Err(AppError::InvalidCredentials.into());
        }

        ensure_can_authenticate(&user).inspect_err(|e| {
            warn!(user_id = %user.id, error = %e, "Credentials rejected: account not active");
        })?;

        Ok(user)
    }

    /// Create an active `User` account
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> ServiceResult<User> {
        self.create_account(email, password, Role::User).await
    }

    pub(crate) async fn create_account(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> ServiceResult<User> {
        let email = normalize_email(email);
        if !email.validate_email() {
            return Err(DomainError::InvalidEmail.into());
        }

        validate_password_policy(password)?;

        if self.ctx.users().email_exists(&email).await? {
            return Err(DomainError::EmailAlreadyExists.into());
        }

        let password_hash = self.ctx.password_hasher().hash(password)?;
        let user = self
            .ctx
            .users()
            .create(&NewUser {
                email,
                password_hash,
                role,
            })
            .await?;

        info!(user_id = %user.id, role = %user.role, "Account created");
        Ok(user)
    }
}
