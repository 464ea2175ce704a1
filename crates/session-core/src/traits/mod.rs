//! Ports implemented by the infrastructure layer

mod hasher;
mod repositories;

pub use hasher::PasswordHasher;
pub use repositories::{RepoResult, SessionStore, SessionTx, UserRepository};
