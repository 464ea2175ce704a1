//! Value objects - immutable types that represent domain concepts

mod ids;
mod role;

pub use ids::{IdParseError, PasswordResetId, RefreshTokenId, UserId};
pub use role::{Role, RoleParseError};
