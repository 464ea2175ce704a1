//! Repository implementations
//!
//! PostgreSQL implementations of the storage ports defined in session-core.

mod error;
mod session_store;
mod user;

pub use session_store::{PgSessionStore, PgSessionTx};
pub use user::PgUserRepository;
