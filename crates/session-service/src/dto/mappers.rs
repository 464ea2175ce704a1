//! Entity to DTO conversions

use session_core::entities::User;

use super::responses::{AuthResponse, CurrentUserResponse};
use crate::services::TokenPair;

impl From<&User> for CurrentUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

impl From<TokenPair> for AuthResponse {
    fn from(pair: TokenPair) -> Self {
        AuthResponse::new(
            pair.access.token,
            pair.refresh_token,
            pair.access.expires_in,
            CurrentUserResponse::from(&pair.user),
        )
    }
}
