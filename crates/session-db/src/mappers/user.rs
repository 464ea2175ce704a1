//! User entity <-> model mapper

use session_core::entities::User;
use session_core::value_objects::{Role, UserId};

use crate::models::UserModel;

/// Unknown role strings fall back to the least privileged role
fn parse_role(role: &str) -> Role {
    role.parse().unwrap_or_default()
}

/// Convert UserModel to User entity
impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: UserId::new(model.id),
            email: model.email,
            role: parse_role(&model.role),
            is_active: model.is_active,
            is_deleted: model.is_deleted,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
