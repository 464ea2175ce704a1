//! Password reset entity <-> model mapper

use session_core::entities::PasswordResetToken;
use session_core::value_objects::{PasswordResetId, UserId};

use crate::models::PasswordResetModel;

impl From<PasswordResetModel> for PasswordResetToken {
    fn from(model: PasswordResetModel) -> Self {
        PasswordResetToken {
            id: PasswordResetId::new(model.id),
            user_id: UserId::new(model.user_id),
            token_hash: model.token_hash,
            expires_at: model.expires_at,
            used_at: model.used_at,
            is_revoked: model.is_revoked,
            created_at: model.created_at,
        }
    }
}
