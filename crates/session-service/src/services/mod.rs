//! Business logic services
//!
//! Each service borrows a [`ServiceContext`] and is cheap to construct per
//! call. Anything that must be atomic runs inside one `SessionTx`.

pub mod account;
pub mod auth;
pub mod context;
pub mod credentials;
pub mod error;
pub mod ledger;
pub mod password_reset;
pub mod session_policy;

#[cfg(test)]
pub(crate) mod testing;

// Re-export all services for convenience
pub use account::AccountService;
pub use auth::{AuthService, LogoutOutcome, Principal};
pub use context::{ServiceContext, ServiceContextBuilder};
pub use credentials::{normalize_email, CredentialService};
pub use error::{ServiceError, ServiceResult};
pub use ledger::{IssuedRefreshToken, RefreshTokenLedger, RevokeOutcome, TokenPair};
pub use password_reset::{PasswordResetService, ResetTokenDelivery};
pub use session_policy::{ensure_single_session, supersede_prior_sessions};
