//! Shared helpers for the API integration tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use swapmeet_api::{AppState, AppStateInner, router};
use swapmeet_db::Database;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_BODY_LIMIT: usize = 2 * 1024 * 1024;

pub fn test_app() -> (Router, AppState) {
    let db = Database::open_in_memory().expect("in-memory database should open");
    let state = AppStateInner::new(db, TEST_SECRET);
    (router(state.clone(), TEST_BODY_LIMIT), state)
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Register `username` and return the issued token.
pub async fn register(app: &Router, username: &str) -> String {
    let body = json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "correct-horse-battery",
    });
    let (status, value) = send(app, json_request("POST", "/api/auth/register", None, &body)).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", value);
    value["token"].as_str().unwrap().to_string()
}

pub fn listing(title: &str) -> Value {
    json!({
        "title": title,
        "description": "Barely used, works perfectly",
        "category": "Electronics",
        "condition": "Like New",
        "price": 12.5,
        "imageUrl": "data:image/jpeg;base64,/9j/4AAQ",
    })
}
