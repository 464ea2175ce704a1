//! Session lifecycle tests against the in-memory store
//!
//! These run the full service stack (Argon2, JWT, peppered refresh hashes)
//! with no external dependencies.
//!
//! Run with: cargo test -p integration-tests --test session_lifecycle

use chrono::{Duration, Utc};
use futures::future::join_all;
use integration_tests::{
    app_error, fixtures::*, test_config, test_config_with, TestHarness, JWT_SECRET,
    PRIMARY_ADMIN_EMAIL,
};
use session_common::AppError;
use session_core::events::AccountEvent;
use session_core::value_objects::Role;
use session_service::dto::{
    AdminResetPasswordRequest, ChangeRoleRequest, ForgotPasswordRequest, ForgotPasswordResponse,
    LoginRequest, RefreshTokenRequest, ResetPasswordRequest, SetActiveRequest,
};
use session_service::{AuthService, ServiceContext};

fn forgot(email: &str) -> ForgotPasswordRequest {
    ForgotPasswordRequest {
        email: email.to_string(),
    }
}

fn reset(token: &str, new_password: &str) -> ResetPasswordRequest {
    ResetPasswordRequest {
        token: token.to_string(),
        new_password: new_password.to_string(),
    }
}

// ============================================================================
// Single-session invariant
// ============================================================================

#[tokio::test]
async fn test_at_most_one_live_session_after_login_and_refresh() {
    let harness = TestHarness::memory().expect("Failed to build harness");
    let (account, user, mut session) = harness.signed_in().await.unwrap();
    assert_eq!(harness.active_sessions(user.id).await.unwrap(), 1);

    for round in 0..3 {
        session = harness.refresh(&session.refresh_token).await.unwrap();
        assert_eq!(
            harness.active_sessions(user.id).await.unwrap(),
            1,
            "after refresh in round {round}"
        );

        session = harness.auth().login(account.login_request()).await.unwrap();
        assert_eq!(
            harness.active_sessions(user.id).await.unwrap(),
            1,
            "after login in round {round}"
        );
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_rotation_replaces_the_presented_token() {
    let harness = TestHarness::memory().unwrap();
    let (_, user, first) = harness.signed_in().await.unwrap();

    let second = harness.refresh(&first.refresh_token).await.unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);
    assert_ne!(second.access_token, first.access_token);

    let principal = harness.auth().authorize(&second.access_token).await.unwrap();
    assert_eq!(principal.user_id, user.id);

    let err = app_error(harness.refresh(&first.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked), "got {err:?}");

    // a replayed token does not take the live chain down with it
    harness.refresh(&second.refresh_token).await.unwrap();
}

#[tokio::test]
async fn test_second_login_revokes_the_first() {
    let harness = TestHarness::memory().unwrap();
    let (account, user, first) = harness.signed_in().await.unwrap();
    let second = harness.auth().login(account.login_request()).await.unwrap();

    let err = app_error(harness.refresh(&first.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));

    harness.refresh(&second.refresh_token).await.unwrap();

    let records = harness
        .ctx
        .sessions()
        .list_refresh_tokens(user.id)
        .await
        .unwrap();
    assert_eq!(records.len(), 3);
    assert!(records
        .iter()
        .filter(|r| r.is_revoked)
        .all(|r| r.revoked_by == Some(user.id) && r.revoked_at.is_some()));
}

#[tokio::test]
async fn test_admin_password_reset_ends_every_session() {
    let harness = TestHarness::memory().unwrap();
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
    assert_eq!(change.event, AccountEvent::PasswordReset);
    assert_eq!(change.sessions_revoked, 1);

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));
    assert_eq!(harness.active_sessions(user.id).await.unwrap(), 0);

    let records = harness
        .ctx
        .sessions()
        .list_refresh_tokens(user.id)
        .await
        .unwrap();
    assert_eq!(records[0].revoked_by, Some(admin.id));

    let err = app_error(harness.auth().login(account.login_request()).await).unwrap();
    assert!(matches!(err, AppError::InvalidCredentials));

    harness
        .auth()
        .login(account.with_password(NEW_PASSWORD).login_request())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_password_reset_flow() {
    let harness = TestHarness::memory().unwrap();
    let (account, user, session) = harness.signed_in().await.unwrap();

    let response = harness.resets().request(forgot(&account.email)).await.unwrap();
    let token = response.reset_token.expect("reset token outside production");
    let expires_at = response.expires_at.unwrap();
    assert!(expires_at > Utc::now() + Duration::minutes(14));
    assert!(expires_at <= Utc::now() + Duration::minutes(15));

    let change = harness
        .resets()
        .consume(reset(&token, NEW_PASSWORD))
        .await
        .unwrap();
    assert_eq!(change.user_id, user.id);
    assert_eq!(change.sessions_revoked, 1);

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));

    let err = app_error(
        harness
            .resets()
            .consume(reset(&token, "Another-Pass789!"))
            .await,
    )
    .unwrap();
    assert!(matches!(err, AppError::TokenInvalid));

    harness
        .auth()
        .login(account.with_password(NEW_PASSWORD).login_request())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_reset_token_fails_like_a_used_one() {
    let mut config = test_config("postgres://unused").unwrap();
    config.session.password_reset_ttl = 0;
    let harness = TestHarness::memory_with(config).unwrap();
    let account = TestAccount::unique();
    harness.register(&account).await.unwrap();

    let token = harness
        .resets()
        .request(forgot(&account.email))
        .await
        .unwrap()
        .reset_token
        .unwrap();

    let err = app_error(harness.resets().consume(reset(&token, NEW_PASSWORD)).await).unwrap();
    assert!(matches!(err, AppError::TokenInvalid));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rotation_has_exactly_one_winner() {
    let harness = TestHarness::memory().unwrap();
    let (_, user, session) = harness.signed_in().await.unwrap();

    let attempts = (0..8).map(|_| {
        let ctx: ServiceContext = harness.ctx.clone();
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

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_leave_one_session() {
    let harness = TestHarness::memory().unwrap();
    let account = TestAccount::unique();
    let user = harness.register(&account).await.unwrap();

    let logins = (0..4).map(|_| {
        let ctx = harness.ctx.clone();
        let request: LoginRequest = account.login_request();
        tokio::spawn(async move { AuthService::new(&ctx).login(request).await })
    });

    let mut refresh_tokens = Vec::new();
    for outcome in join_all(logins).await {
        let response = outcome.expect("login task panicked").unwrap();
        refresh_tokens.push(response.refresh_token);
    }

    assert_eq!(harness.active_sessions(user.id).await.unwrap(), 1);

    let mut rotated = 0;
    for token in &refresh_tokens {
        if harness.refresh(token).await.is_ok() {
            rotated += 1;
        }
    }
    assert_eq!(rotated, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_login_racing_refresh_leaves_one_session() {
    let harness = TestHarness::memory().unwrap();
    let (account, user, session) = harness.signed_in().await.unwrap();

    let login_ctx = harness.ctx.clone();
    let request = account.login_request();
    let login = tokio::spawn(async move { AuthService::new(&login_ctx).login(request).await });

    let refresh_ctx = harness.ctx.clone();
    let raw = session.refresh_token.clone();
    let refresh = tokio::spawn(async move {
        AuthService::new(&refresh_ctx)
            .refresh(RefreshTokenRequest { refresh_token: raw })
            .await
    });

    let (login, refresh) = tokio::join!(login, refresh);
    login.unwrap().unwrap();
    if let Err(err) = refresh.unwrap() {
        assert!(matches!(err.as_app(), Some(AppError::TokenRevoked)), "got {err}");
    }

    assert_eq!(harness.active_sessions(user.id).await.unwrap(), 1);
}

// ============================================================================
// Account status propagation
// ============================================================================

#[tokio::test]
async fn test_deactivation_cuts_off_live_tokens() {
    let harness = TestHarness::memory().unwrap();
    let admin = harness.admin().await.unwrap();
    let (account, user, session) = harness.signed_in().await.unwrap();

    let change = harness
        .accounts()
        .set_active(admin.id, user.id, SetActiveRequest { is_active: false })
        .await
        .unwrap();
    assert_eq!(change.event, AccountEvent::Deactivated);
    assert_eq!(change.sessions_revoked, 1);

    let err = app_error(harness.auth().authorize(&session.access_token).await).unwrap();
    assert!(matches!(err, AppError::AccountDisabled));

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));

    let err = app_error(harness.auth().login(account.login_request()).await).unwrap();
    assert!(matches!(err, AppError::AccountDisabled));

    let change = harness
        .accounts()
        .set_active(admin.id, user.id, SetActiveRequest { is_active: true })
        .await
        .unwrap();
    assert_eq!(change.event, AccountEvent::Reactivated);

    harness.auth().login(account.login_request()).await.unwrap();
}

#[tokio::test]
async fn test_soft_delete_cuts_off_live_tokens() {
    let harness = TestHarness::memory().unwrap();
    let (account, user, session) = harness.signed_in().await.unwrap();

    let change = harness.accounts().soft_delete(user.id).await.unwrap();
    assert_eq!(change.event, AccountEvent::Deleted);

    let err = app_error(harness.auth().authorize(&session.access_token).await).unwrap();
    assert!(matches!(err, AppError::AccountDeleted));

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));

    let err = app_error(harness.auth().login(account.login_request()).await).unwrap();
    assert!(matches!(err, AppError::AccountDeleted));
}

#[tokio::test]
async fn test_failed_rotation_leaves_the_token_untouched() {
    let harness = TestHarness::memory().unwrap();
    let (_, user, session) = harness.signed_in().await.unwrap();

    // disable without going through the account service so the session survives
    let mut tx = harness.ctx.sessions().begin().await.unwrap();
    tx.update_account_flags(user.id, false, false).await.unwrap();
    tx.commit().await.unwrap();

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::AccountDisabled));

    let records = harness
        .ctx
        .sessions()
        .list_refresh_tokens(user.id)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_revoked);
}

#[tokio::test]
async fn test_role_change_invalidates_outstanding_tokens() {
    let harness = TestHarness::memory().unwrap();
    let admin = harness.admin().await.unwrap();
    let (_, user, session) = harness.signed_in().await.unwrap();

    let change = harness
        .accounts()
        .change_role(admin.id, user.id, ChangeRoleRequest { role: Role::Admin })
        .await
        .unwrap();
    assert_eq!(
        change.event,
        AccountEvent::RoleChanged {
            from: Role::User,
            to: Role::Admin
        }
    );
    assert_eq!(change.sessions_revoked, 1);

    let err = app_error(harness.auth().authorize(&session.access_token).await).unwrap();
    assert!(matches!(err, AppError::TokenInvalid));

    let err = app_error(harness.refresh(&session.refresh_token).await).unwrap();
    assert!(matches!(err, AppError::TokenRevoked));
}

#[tokio::test]
async fn test_primary_admin_is_protected() {
    let harness = TestHarness::memory().unwrap();
    let admin = harness.admin().await.unwrap();
    assert_eq!(admin.email, PRIMARY_ADMIN_EMAIL);
    assert_eq!(admin.role, Role::Admin);

    let again = harness.admin().await.unwrap();
    assert_eq!(again.id, admin.id);

    let err = app_error(harness.accounts().soft_delete(admin.id).await).unwrap();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app_error(
        harness
            .accounts()
            .change_role(admin.id, admin.id, ChangeRoleRequest { role: Role::User })
            .await,
    )
    .unwrap();
    assert!(matches!(err, AppError::Forbidden(_)));
}

// ============================================================================
// Enumeration resistance and configuration
// ============================================================================

#[tokio::test]
async fn test_login_failures_do_not_reveal_accounts() {
    let harness = TestHarness::memory().unwrap();
    let account = TestAccount::unique();
    harness.register(&account).await.unwrap();

    let wrong_password = app_error(
        harness
            .auth()
            .login(account.with_password("Wrong-Pass000!").login_request())
            .await,
    )
    .unwrap();
    let unknown = app_error(
        harness
            .auth()
            .login(TestAccount::unique().login_request())
            .await,
    )
    .unwrap();

    assert!(matches!(wrong_password, AppError::InvalidCredentials));
    assert!(matches!(unknown, AppError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown.to_string());
}

#[tokio::test]
async fn test_forgot_password_is_generic_in_production() {
    let config = test_config_with("postgres://unused", &[("APP_ENV", "production")]).unwrap();
    let harness = TestHarness::memory_with(config).unwrap();
    let account = TestAccount::unique();
    harness.register(&account).await.unwrap();

    let known = harness.resets().request(forgot(&account.email)).await.unwrap();
    let unknown = harness
        .resets()
        .request(forgot("nobody@example.com"))
        .await
        .unwrap();

    assert_eq!(known, ForgotPasswordResponse::generic());
    assert_eq!(known, unknown);
}

#[test]
fn test_shared_key_material_is_rejected() {
    let result = test_config_with("postgres://unused", &[("REFRESH_TOKEN_PEPPER", JWT_SECRET)]);
    assert!(result.is_err());

    let result = test_config_with("postgres://unused", &[("JWT_SECRET", "too-short")]);
    assert!(result.is_err());
}

#[test]
fn test_oversized_lifetimes_are_rejected() {
    for key in ["REFRESH_TOKEN_TTL", "PASSWORD_RESET_TTL", "JWT_ACCESS_TOKEN_TTL"] {
        let result = test_config_with("postgres://unused", &[(key, "100000000000000")]);
        assert!(result.is_err(), "{key} accepted an unbounded lifetime");
    }
}
