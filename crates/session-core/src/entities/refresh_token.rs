//! Refresh token record - the system of record for session liveness

use chrono::{DateTime, Utc};

use crate::value_objects::{RefreshTokenId, UserId};

/// Persisted refresh token. Only the keyed hash of the secret is stored.
///
/// Records are only ever flipped to revoked, never deleted, so the table
/// doubles as a revocation audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<UserId>,
}

impl RefreshToken {
    #[inline]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Not revoked and not expired
    #[inline]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && !self.is_expired_at(now)
    }
}

/// Values required to persist a freshly issued refresh token
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Who revoked a session and when
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revocation {
    pub actor: UserId,
    pub at: DateTime<Utc>,
}

impl Revocation {
    pub fn now_by(actor: UserId) -> Self {
        Self {
            actor,
            at: Utc::now(),
        }
    }
}
