//! Password reset record

use chrono::{DateTime, Utc};

use crate::value_objects::{PasswordResetId, UserId};

/// Single-use, short-lived reset secret, stored as a plain SHA-256 hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetToken {
    pub id: PasswordResetId,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    #[inline]
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Unused, unrevoked and inside its window
    pub fn is_consumable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used() && !self.is_revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct NewPasswordResetToken {
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}
