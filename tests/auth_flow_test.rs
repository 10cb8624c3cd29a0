mod common;

use labledger_api::errors::ServiceError;
use labledger_api::services::users::{AdminUpdateUserRequest, ListUsersQuery, UpdateProfileRequest};

#[tokio::test]
async fn register_login_and_token_resolution_round_trip() {
    let ctx = common::setup().await;

    let account = ctx
        .auth
        .register("chemist@lab.test", "Bench Chemist", "correct horse battery")
        .await
        .expect("register");
    assert!(account.is_active);
    assert!(!account.is_admin);

    let (logged_in, tokens) = ctx
        .auth
        .login("chemist@lab.test", "correct horse battery")
        .await
        .expect("login");
    assert_eq!(logged_in.id, account.id);
    assert_eq!(tokens.token_type, "bearer");

    let resolved = ctx
        .auth
        .authenticate(&tokens.access_token)
        .await
        .expect("token resolves");
    assert_eq!(resolved.id, account.id);
    assert_eq!(resolved.email, "chemist@lab.test");
}

#[tokio::test]
async fn duplicate_email_registration_conflicts() {
    let ctx = common::setup().await;

    ctx.auth
        .register("chemist@lab.test", "First", "password123")
        .await
        .unwrap();

    let second = ctx
        .auth
        .register("chemist@lab.test", "Second", "password456")
        .await;
    assert!(matches!(second, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let ctx = common::setup().await;
    ctx.auth
        .register("chemist@lab.test", "Bench Chemist", "password123")
        .await
        .unwrap();

    let result = ctx.auth.login("chemist@lab.test", "not-the-password").await;
    assert!(matches!(result, Err(ServiceError::Unauthorized(_))));

    let result = ctx.auth.login("nobody@lab.test", "password123").await;
    assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
}

#[tokio::test]
async fn profile_update_rechecks_email_uniqueness() {
    let ctx = common::setup().await;
    let first = ctx
        .auth
        .register("one@lab.test", "One", "password123")
        .await
        .unwrap();
    ctx.auth
        .register("two@lab.test", "Two", "password123")
        .await
        .unwrap();

    let clash = ctx
        .services
        .users
        .update_profile(
            first.id,
            UpdateProfileRequest {
                email: Some("two@lab.test".into()),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(clash, Err(ServiceError::Conflict(_))));

    let renamed = ctx
        .services
        .users
        .update_profile(
            first.id,
            UpdateProfileRequest {
                full_name: Some("One Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.full_name, "One Renamed");
}

#[tokio::test]
async fn admin_update_toggles_flags_and_password_still_verifies() {
    let ctx = common::setup().await;
    let account = ctx
        .auth
        .register("analyst@lab.test", "Analyst", "password123")
        .await
        .unwrap();

    let demoted = ctx
        .services
        .users
        .admin_update(
            account.id,
            AdminUpdateUserRequest {
                is_active: Some(false),
                is_admin: Some(true),
                password: Some("rotated-password".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!demoted.is_active);
    assert!(demoted.is_admin);

    // New credential works, old one does not
    assert!(ctx
        .auth
        .login("analyst@lab.test", "rotated-password")
        .await
        .is_ok());
    assert!(ctx
        .auth
        .login("analyst@lab.test", "password123")
        .await
        .is_err());

    let (users, total) = ctx
        .services
        .users
        .list(ListUsersQuery::default())
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(users.len(), 1);
}
