//! Password reset token database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for password_reset_tokens table
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetModel {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}
