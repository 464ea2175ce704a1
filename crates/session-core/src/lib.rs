//! # session-core
//!
//! Domain layer for account sessions: entities, value objects, account events
//! and the ports (repository and hasher traits) the infrastructure implements.
//! This crate has zero dependencies on infrastructure (database, crypto, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    NewPasswordResetToken, NewRefreshToken, NewUser, PasswordResetToken, RefreshToken, Revocation,
    Standing, User,
};
pub use error::DomainError;
pub use events::{AccountChange, AccountEvent};
pub use traits::{PasswordHasher, RepoResult, SessionStore, SessionTx, UserRepository};
pub use value_objects::{
    IdParseError, PasswordResetId, RefreshTokenId, Role, RoleParseError, UserId,
};
