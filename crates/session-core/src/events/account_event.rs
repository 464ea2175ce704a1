//! Account events - status changes that must propagate into session state

use serde::{Deserialize, Serialize};

use crate::value_objects::{Role, UserId};

/// An account change that invalidates (or re-enables) the account's sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountEvent {
    Deactivated,
    Reactivated,
    Deleted,
    RoleChanged { from: Role, to: Role },
    PasswordReset,
}

impl AccountEvent {
    /// Every event except reactivation kills all live sessions
    pub fn revokes_sessions(&self) -> bool {
        !matches!(self, Self::Reactivated)
    }
}

/// Outcome of applying an account event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountChange {
    pub user_id: UserId,
    pub event: AccountEvent,
    pub sessions_revoked: u64,
}
