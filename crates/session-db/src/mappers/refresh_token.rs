//! Refresh token entity <-> model mapper

use session_core::entities::RefreshToken;
use session_core::value_objects::{RefreshTokenId, UserId};

use crate::models::RefreshTokenModel;

impl From<RefreshTokenModel> for RefreshToken {
    fn from(model: RefreshTokenModel) -> Self {
        RefreshToken {
            id: RefreshTokenId::new(model.id),
            user_id: UserId::new(model.user_id),
            token_hash: model.token_hash,
            expires_at: model.expires_at,
            created_at: model.created_at,
            is_revoked: model.is_revoked,
            revoked_at: model.revoked_at,
            revoked_by: model.revoked_by_user_id.map(UserId::new),
        }
    }
}
