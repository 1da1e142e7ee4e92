//! Integration tests for login, token handling, and the admin-only account
//! management surface.

mod common;

use axum::http::Method;
use common::{response_json, TestApp, ADMIN_EMAIL, ADMIN_PASSWORD, EMPLOYEE_EMAIL};
use serde_json::json;

#[tokio::test]
async fn login_with_valid_credentials_returns_token_and_identity() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert!(body["access_token"].as_str().is_some());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);
    assert_eq!(body["user"]["role"], "administrator");
    assert_eq!(body["user"]["name"], "Root");
    assert!(body["user"]["id"].as_str().is_some());
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let app = TestApp::new().await;

    let wrong_password = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": "not-the-password" })),
            None,
        )
        .await;
    assert_eq!(wrong_password.status(), 401);
    let wrong_password_body = response_json(wrong_password).await;

    let unknown_email = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "nobody@stockfox.test", "password": ADMIN_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(unknown_email.status(), 401);
    let unknown_email_body = response_json(unknown_email).await;

    // Same generic message either way.
    assert_eq!(wrong_password_body["message"], unknown_email_body["message"]);
    assert_eq!(wrong_password_body["message"], "Invalid credentials");
}

#[tokio::test]
async fn issued_token_grants_access_to_protected_endpoints() {
    let app = TestApp::new().await;

    let login = response_json(
        app.request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
            None,
        )
        .await,
    )
    .await;
    let token = login["access_token"].as_str().expect("token").to_string();

    let response = app
        .request(Method::GET, "/api/v1/products", None, Some(&token))
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn missing_and_malformed_tokens_are_rejected() {
    let app = TestApp::new().await;

    let missing = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(missing.status(), 401);

    for bad_token in ["garbage", "eyJhbGciOiJIUzI1NiJ9.e30", ""] {
        let response = app
            .request(Method::GET, "/api/v1/products", None, Some(bad_token))
            .await;
        assert_eq!(response.status(), 401, "token {:?} should be rejected", bad_token);
    }
}

#[tokio::test]
async fn employee_cannot_reach_account_management() {
    let app = TestApp::new().await;

    let response = app.request_employee(Method::GET, "/api/v1/users", None).await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn admin_lists_accounts_without_exposing_hashes() {
    let app = TestApp::new().await;

    let response = app.request_admin(Method::GET, "/api/v1/users", None).await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    let items = body["data"]["items"].as_array().expect("items");
    assert_eq!(items.len(), 2);

    let raw = body.to_string();
    assert!(!raw.contains("password_hash"));
    assert!(!raw.contains("$argon2"));
}

#[tokio::test]
async fn admin_creates_account_and_new_user_can_login() {
    let app = TestApp::new().await;

    let created = app
        .request_admin(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Beto",
                "email": "beto@stockfox.test",
                "role": "employee",
                "phone": "+51 999 222 333",
                "password": "betopassword"
            })),
        )
        .await;
    assert_eq!(created.status(), 201);

    let login = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": "beto@stockfox.test", "password": "betopassword" })),
            None,
        )
        .await;
    assert_eq!(login.status(), 200);
    let body = response_json(login).await;
    assert_eq!(body["user"]["role"], "employee");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request_admin(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Clone",
                "email": EMPLOYEE_EMAIL,
                "password": "clonepassword"
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn invalid_role_and_short_password_are_rejected() {
    let app = TestApp::new().await;

    let bad_role = app
        .request_admin(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "X",
                "email": "x@stockfox.test",
                "role": "superuser",
                "password": "longenough1"
            })),
        )
        .await;
    // Role values outside the enum never reach the query layer.
    assert_eq!(bad_role.status(), 400);

    let short_password = app
        .request_admin(
            Method::POST,
            "/api/v1/users",
            Some(json!({
                "name": "Y",
                "email": "y@stockfox.test",
                "password": "short"
            })),
        )
        .await;
    assert_eq!(short_password.status(), 400);
}

#[tokio::test]
async fn admin_updates_role_and_password() {
    let app = TestApp::new().await;
    let employee_id = app.employee_id;

    let updated = app
        .request_admin(
            Method::PUT,
            &format!("/api/v1/users/{employee_id}"),
            Some(json!({ "role": "administrator", "password": "freshpassword" })),
        )
        .await;
    assert_eq!(updated.status(), 200);
    let body = response_json(updated).await;
    assert_eq!(body["data"]["role"], "administrator");

    // Old password no longer works, new one does.
    let old = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": EMPLOYEE_EMAIL, "password": common::EMPLOYEE_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(old.status(), 401);

    let fresh = app
        .request(
            Method::POST,
            "/auth/login",
            Some(json!({ "email": EMPLOYEE_EMAIL, "password": "freshpassword" })),
            None,
        )
        .await;
    assert_eq!(fresh.status(), 200);
}

#[tokio::test]
async fn user_filter_field_is_allow_listed() {
    let app = TestApp::new().await;

    // "registered_at" is not a filterable field; deserialization rejects it
    // before any SQL is built.
    let response = app
        .request_admin(
            Method::GET,
            "/api/v1/users?field=registered_at&value=2026",
            None,
        )
        .await;
    assert_eq!(response.status(), 400);

    let ok = app
        .request_admin(Method::GET, "/api/v1/users?field=email&value=ana", None)
        .await;
    assert_eq!(ok.status(), 200);
    let body = response_json(ok).await;
    assert_eq!(body["data"]["items"].as_array().expect("items").len(), 1);
}
