//! Single-session policy
//!
//! An account holds at most one live refresh token. Login clears every prior
//! session before issuing; rotation refuses to proceed when it finds more
//! than the presented one alive.

use chrono::{DateTime, Utc};
use session_common::AppError;
use session_core::entities::Revocation;
use session_core::traits::SessionTx;
use session_core::value_objects::{RefreshTokenId, UserId};
use tracing::{info, warn};

use super::error::ServiceResult;

/// Revoke every live refresh token of the user, audited as revoked by the
/// user themself. Returns how many were revoked.
pub async fn supersede_prior_sessions(
    tx: &mut dyn SessionTx,
    user_id: UserId,
) -> ServiceResult<u64> {
    let revoked = tx
        .revoke_active_refresh_tokens(user_id, &Revocation::now_by(user_id))
        .await?;

    if revoked > 0 {
        info!(user_id = %user_id, revoked, "Superseded prior sessions");
    }
    Ok(revoked)
}

/// Fail with `SessionConflict` if anything besides `presented` is alive
pub async fn ensure_single_session(
    tx: &mut dyn SessionTx,
    user_id: UserId,
    presented: RefreshTokenId,
    now: DateTime<Utc>,
) -> ServiceResult<()> {
    let others = tx
        .count_other_active_refresh_tokens(user_id, presented, now)
        .await?;

    if others > 0 {
        warn!(user_id = %user_id, others, "Session conflict: more than one live refresh token");
        return Err(AppError::SessionConflict.into());
    }
    Ok(())
}
