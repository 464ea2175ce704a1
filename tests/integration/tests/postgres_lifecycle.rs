//! Session lifecycle tests against PostgreSQL
//!
//! These tests require:
//! - Running PostgreSQL instance
//! - Environment variable: DATABASE_URL
//!
//! Run with: cargo test -p integration-tests --test postgres_lifecycle

use futures::future::join_all;
use integration_tests::{app_error, fixtures::*, TestHarness};
use session_common::AppError;
use session_service::dto::{
    AdminResetPasswordRequest, ForgotPasswordRequest, RefreshTokenRequest, ResetPasswordRequest,
    SetActiveRequest,
};
use session_service::AuthService;

macro_rules! postgres_harness {
    () => {
        match TestHarness::postgres()
            .await
            .expect("Failed to build PostgreSQL harness")
        {
            Some(harness) => harness,
            None => return,
        }
    };
}

#[tokio::test]
async fn test_rotation_and_replay() {
    let harness = postgres_harness!();
    let (_, user, first) = harness.signed_in().await.unwrap();

    let second = harness.refresh(&first.refresh_token).await.unwrap();
    assert_eq!(harness.active_sessions(user.id).await.unwrap(), 1);

    let err = app_error(harness.refresh(&first.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));

    harness.refresh(&second.refresh_token).await.unwrap();
    assert_eq!(harness.active_sessions(user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_second_login_supersedes_first() {
    let harness = postgres_harness!();
    let (account, user, first) = harness.signed_in().await.unwrap();
    let second = harness.auth().login(account.login_request()).await.unwrap();

    assert_eq!(harness.active_sessions(user.id).await.unwrap(), 1);

    let err = app_error(harness.refresh(&first.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));
    harness.refresh(&second.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_admin_password_reset() {
    let harness = postgres_harness!();
    let admin = harness.admin().await.unwrap();
    let (account, user, session) = harness.signed_in().await.unwrap();

    let change = harness
        .accounts()
        .admin_reset_password(
            admin.id,
            user.id,
            AdminResetPasswordRequest {
                new_password: NEW_PASSWORD.to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(change.sessions_revoked, 1);

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));

    harness
        .auth()
        .login(account.with_password(NEW_PASSWORD).login_request())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_password_reset_is_single_use() {
    let harness = postgres_harness!();
    let (account, user, session) = harness.signed_in().await.unwrap();

    let token = harness
        .resets()
        .request(ForgotPasswordRequest {
            email: account.email.clone(),
        })
        .await
        .unwrap()
        .reset_token
        .expect("reset token outside production");

    let consume = |token: &str| ResetPasswordRequest {
        token: token.to_string(),
        new_password: NEW_PASSWORD.to_string(),
    };

    let change = harness.resets().consume(consume(&token)).await.unwrap();
    assert_eq!(change.user_id, user.id);
    assert_eq!(change.sessions_revoked, 1);

    let err = app_error(harness.resets().consume(consume(&token)).await).unwrap();
    assert!(matches!(err, AppError::TokenInvalid));

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_has_exactly_one_winner() {
    let harness = postgres_harness!();
    let (_, user, session) = harness.signed_in().await.unwrap();

    let attempts = (0..8).map(|_| {
        let ctx = harness.ctx.clone();
        let raw = session.refresh_token.clone();
        tokio::spawn(async move {
            AuthService::new(&ctx)
                .refresh(RefreshTokenRequest { refresh_token: raw })
                .await
        })
    });

    let mut winners = 0;
    for outcome in join_all(attempts).await {
        match outcome.expect("rotation task panicked") {
            Ok(_) => winners += 1,
            Err(err) => assert!(
                matches!(
                    err.as_app(),
                    Some(AppError::TokenRevoked | AppError::TokenNotFound)
                ),
                "unexpected rotation failure: {err}"
            ),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(harness.active_sessions(user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_deactivation_propagates() {
    let harness = postgres_harness!();
    let admin = harness.admin().await.unwrap();
    let (_, user, session) = harness.signed_in().await.unwrap();

    harness
        .accounts()
        .set_active(admin.id, user.id, SetActiveRequest { is_active: false })
        .await
        .unwrap();

    let err = app_error(harness.auth().authorize(&session.access_token).await).unwrap();
    assert!(matches!(err, AppError::AccountDisabled));

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));
}
