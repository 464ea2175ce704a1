//! User entity - an account that can hold sessions

use chrono::{DateTime, Utc};

use crate::value_objects::{Role, UserId};

/// Account standing as seen by authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Standing {
    Active,
    Disabled,
    Deleted,
}

/// User account. Never hard-deleted; `is_deleted` marks a soft delete.
///
/// The password hash is deliberately not part of the entity and is only
/// read through the repository when credentials are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Deleted wins over disabled: a soft-deleted account is always inactive too.
    pub fn standing(&self) -> Standing {
        if self.is_deleted {
            Standing::Deleted
        } else if !self.is_active {
            Standing::Disabled
        } else {
            Standing::Active
        }
    }

    #[inline]
    pub fn can_authenticate(&self) -> bool {
        self.standing() == Standing::Active
    }

    /// Administrative accounts cannot be deactivated or deleted through
    /// self-service or peer-admin actions.
    #[inline]
    pub fn is_protected(&self) -> bool {
        self.role.is_admin()
    }
}

/// Values required to create an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}
