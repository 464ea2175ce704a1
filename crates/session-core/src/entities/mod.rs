//! Domain entities - accounts and the session records they own

mod password_reset;
mod refresh_token;
mod user;

pub use password_reset::{NewPasswordResetToken, PasswordResetToken};
pub use refresh_token::{NewRefreshToken, RefreshToken, Revocation};
pub use user::{NewUser, Standing, User};
