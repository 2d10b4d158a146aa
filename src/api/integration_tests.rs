//! Integration tests for the HTTP surface.
//!
//! These drive the full router (layers, auth gate, handlers) against an
//! in-memory SurrealDB using `tower::ServiceExt::oneshot`.

#![cfg(test)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use surrealdb::Surreal;
use tower::ServiceExt;

use super::{AppState, create_router};
use crate::config::TokenConfig;
use crate::db::{DatabaseConfig, Db, create_connection, ensure_schema};
use crate::types::UserId;

const SECRET: &str = "integration-test-secret";

async fn setup_state() -> AppState {
    let db = create_connection(DatabaseConfig::in_memory()).await.unwrap();
    ensure_schema(&db).await.unwrap();
    state_for(db)
}

fn state_for(db: Db) -> AppState {
    AppState::new(db, &TokenConfig::new(SECRET, 3600).unwrap())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_with_token(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn signup(app: &Router, name: &str, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        post_json(
            "/api/users/signup",
            json!({ "name": name, "email": email, "password": password }),
        ),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        post_json("/api/users/login", json!({ "email": email, "password": password })),
    )
    .await
}

#[tokio::test]
async fn test_root_liveness() {
    let app = create_router(setup_state().await);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Pharma Scan API is running");
}

#[tokio::test]
async fn test_signup_login_me_roundtrip() {
    let app = create_router(setup_state().await);

    let (status, body) = signup(&app, "Ada", "Ada@Example.com", "password1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "Ada");
    assert!(body["user"].get("password_hash").is_none());
    let user_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = login(&app, "ada@example.com", "password1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], user_id.as_str());
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get_with_token("/api/users/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert!(!body.to_string().contains("argon2"));
}

#[tokio::test]
async fn test_signup_token_works_immediately() {
    let app = create_router(setup_state().await);

    let (_, body) = signup(&app, "Bo", "bo@example.com", "password1").await;
    let token = body["token"].as_str().unwrap();

    let (status, me) = send(&app, get_with_token("/api/users/me", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["user"]["id"], body["user"]["id"]);
}

#[tokio::test]
async fn test_token_for_a_does_not_resolve_to_b() {
    let app = create_router(setup_state().await);

    let (_, a) = signup(&app, "A", "a@example.com", "password1").await;
    let (_, b) = signup(&app, "B", "b@example.com", "password2").await;

    let (_, me) = send(
        &app,
        get_with_token("/api/users/me", a["token"].as_str()),
    )
    .await;
    assert_eq!(me["user"]["id"], a["user"]["id"]);
    assert_ne!(me["user"]["id"], b["user"]["id"]);
}

#[tokio::test]
async fn test_duplicate_signup_rejected() {
    let app = create_router(setup_state().await);

    let (status, original) = signup(&app, "First", "dup@example.com", "password1").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = signup(&app, "Second", "DUP@example.com", "otherpass").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "User already exists");

    // Original credentials and record are intact
    let (status, body) = login(&app, "dup@example.com", "password1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], original["user"]["id"]);
    assert_eq!(body["user"]["name"], "First");

    let (status, _) = login(&app, "dup@example.com", "otherpass").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_signups() {
    let state = setup_state().await;
    let db = state.db.clone();
    let app = create_router(state);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                signup(&app, &format!("Racer {}", i), "racer@example.com", "password1").await
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        let (status, _) = handle.await.unwrap();
        statuses.push(status);
    }

    let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
    let conflicts = statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count();
    assert_eq!(created, 1, "statuses: {:?}", statuses);
    assert_eq!(conflicts, statuses.len() - 1, "statuses: {:?}", statuses);

    // Full scan, so a second row could not hide behind the email index
    #[derive(serde::Deserialize)]
    struct EmailRow {
        email: String,
    }

    let mut res = db.query("SELECT email FROM user").await.unwrap();
    let rows: Vec<EmailRow> = res.take(0).unwrap();
    let stored = rows
        .iter()
        .filter(|row| row.email == "racer@example.com")
        .count();
    assert_eq!(stored, 1);

    let (status, _) = login(&app, "racer@example.com", "password1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_user() {
    let app = create_router(setup_state().await);
    signup(&app, "Cy", "cy@example.com", "password1").await;

    let (status, body) = login(&app, "cy@example.com", "wrong-pass").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = login(&app, "nobody@example.com", "password1").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_me_without_token() {
    let app = create_router(setup_state().await);

    let (status, body) = send(&app, get_with_token("/api/users/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authorized, no token provided");
}

#[tokio::test]
async fn test_me_with_non_bearer_scheme() {
    let app = create_router(setup_state().await);

    let req = Request::builder()
        .uri("/api/users/me")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, no token provided");
}

#[tokio::test]
async fn test_me_with_invalid_token() {
    let app = create_router(setup_state().await);

    let (status, body) = send(&app, get_with_token("/api/users/me", Some("abc.def.ghi"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_me_with_token_signed_by_other_secret() {
    let state = setup_state().await;
    let app = create_router(state.clone());
    let (_, body) = signup(&app, "Di", "di@example.com", "password1").await;
    let user_id = UserId::new(body["user"]["id"].as_str().unwrap());

    let foreign = crate::auth::TokenCodec::new(&TokenConfig::new("some-other-secret", 3600).unwrap());
    let token = foreign.issue(&user_id).unwrap().token;

    let (status, body) = send(&app, get_with_token("/api/users/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_me_with_expired_token() {
    let state = setup_state().await;
    let app = create_router(state.clone());
    let (_, body) = signup(&app, "Ed", "ed@example.com", "password1").await;
    let user_id = UserId::new(body["user"]["id"].as_str().unwrap());

    let token = state
        .tokens
        .issue_at(&user_id, Utc::now() - Duration::days(1))
        .unwrap()
        .token;

    let (status, body) = send(&app, get_with_token("/api/users/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn test_me_after_user_deleted() {
    let state = setup_state().await;
    let app = create_router(state.clone());
    let (_, body) = signup(&app, "Flo", "flo@example.com", "password1").await;
    let token = body["token"].as_str().unwrap().to_string();
    let user_id = UserId::new(body["user"]["id"].as_str().unwrap());

    let (status, _) = send(&app, get_with_token("/api/users/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    assert!(state.users.delete_user(&user_id).await.unwrap());

    let (status, body) = send(&app, get_with_token("/api/users/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["message"],
        "The user belonging to this token no longer exists"
    );
}

#[tokio::test]
async fn test_health_connected() {
    let app = create_router(setup_state().await);

    let (status, body) = send(&app, get_with_token("/api/users/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "API is running");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_health_disconnected() {
    let app = create_router(state_for(Surreal::init()));

    let (status, body) = send(&app, get_with_token("/api/users/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_database_down_mid_request_is_500() {
    let app = create_router(state_for(Surreal::init()));

    let (status, body) = login(&app, "x@example.com", "password1").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Database unavailable");
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let app = create_router(setup_state().await);

    let (status, body) = signup(&app, "Gus", "not-an-email", "password1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide a valid email");

    let (status, body) = signup(&app, "Gus", "gus@example.com", "123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Password must be at least 6 characters");

    let (status, body) = signup(&app, "  ", "gus@example.com", "password1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide a name");
}

#[tokio::test]
async fn test_malformed_json_body() {
    let app = create_router(setup_state().await);

    let req = Request::builder()
        .method("POST")
        .uri("/api/users/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some());

    let (status, _) = send(&app, post_json("/api/users/login", json!({ "email": "a@b.co" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_404_envelope() {
    let app = create_router(setup_state().await);

    let (status, body) = send(&app, get_with_token("/api/nothing-here", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not found");
}
