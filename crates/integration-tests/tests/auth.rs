//! Registration, login and bearer token handling over HTTP.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::{Value, json};

use stockroom_integration_tests::{PASSWORD, TestContext, error_kind};

#[tokio::test]
async fn test_register_then_login() {
    let ctx = TestContext::spawn().await;

    let resp = ctx.register("alice", None).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    let resp = ctx.login("alice", PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["id"], user["id"]);
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let ctx = TestContext::spawn().await;
    ctx.user("alice").await;

    let wrong_password = ctx.login("alice", "not-the-password").await;
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    let wrong_password: Value = wrong_password.json().await.unwrap();

    let unknown_user = ctx.login("nobody", PASSWORD).await;
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);
    let unknown_user: Value = unknown_user.json().await.unwrap();

    assert_eq!(wrong_password, unknown_user);
    assert_eq!(error_kind(&unknown_user), "unauthorized");
    assert_eq!(unknown_user["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_duplicate_username_or_email_conflicts() {
    let ctx = TestContext::spawn().await;
    ctx.user("alice").await;

    let resp = ctx.register("alice", None).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(error_kind(&body), "conflict");

    let resp = ctx
        .client
        .post(ctx.url("/auth/register"))
        .json(&json!({
            "username": "alice2",
            "password": PASSWORD,
            "email": "alice@example.com",
            "phone": "5550100199",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_invalid_fields() {
    let ctx = TestContext::spawn().await;

    let valid = json!({
        "username": "alice",
        "password": PASSWORD,
        "email": "alice@example.com",
        "phone": "5550100199",
    });

    for (field, value) in [
        ("username", json!("al")),
        ("username", json!("alice smith")),
        ("password", json!("short")),
        ("email", json!("not-an-email")),
        ("phone", json!("12345")),
        ("role", json!("superuser")),
    ] {
        let mut body = valid.clone();
        body[field] = value;
        let resp = ctx
            .client
            .post(ctx.url("/auth/register"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "field: {field}");
        let err: Value = resp.json().await.unwrap();
        assert_eq!(error_kind(&err), "invalid_argument", "field: {field}");
    }
}

#[tokio::test]
async fn test_admin_registration_is_gated() {
    let ctx = TestContext::spawn().await;

    let resp = ctx.register("mallory", Some("admin")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (_, user_token) = ctx.user("alice").await;
    let resp = ctx
        .client
        .post(ctx.url("/auth/register"))
        .bearer_auth(&user_token)
        .json(&json!({
            "username": "mallory",
            "password": PASSWORD,
            "email": "mallory@example.com",
            "phone": "5550100199",
            "role": "admin",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (_, admin_token) = ctx.admin("boss").await;
    let resp = ctx
        .client
        .post(ctx.url("/auth/register"))
        .bearer_auth(&admin_token)
        .json(&json!({
            "username": "deputy",
            "password": PASSWORD,
            "email": "deputy@example.com",
            "phone": "5550100199",
            "role": "admin",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let deputy: Value = resp.json().await.unwrap();
    assert_eq!(deputy["role"], "admin");
}

#[tokio::test]
async fn test_open_admin_signup() {
    let ctx = TestContext::spawn_with(true).await;

    let resp = ctx.register("founder", Some("admin")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: Value = resp.json().await.unwrap();
    assert_eq!(user["role"], "admin");
}

#[tokio::test]
async fn test_bad_bearer_tokens_are_rejected() {
    let ctx = TestContext::spawn().await;

    let resp = ctx
        .client
        .get(ctx.url("/users/profile"))
        .header("authorization", "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let (_, token) = ctx.user("alice").await;
    let mut tampered = token.clone();
    tampered.push('x');
    let (status, body) = ctx.get_json(&tampered, "/users/profile").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_kind(&body), "unauthorized");

    let resp = ctx
        .client
        .get(ctx.url("/users/profile"))
        .header("authorization", format!("bearer {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
