// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::Response;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use songtrackpro::config::{Config, ServiceKind};
use songtrackpro::db::Database;
use songtrackpro::models::{Tier, User};
use songtrackpro::routes::create_router;
use songtrackpro::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Create a test app for one service role.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(service: ServiceKind) -> (axum::Router, Arc<AppState>) {
    create_test_app_with(Config::test_for(service))
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Database::in_memory()).expect("Failed to build test state"));
    (create_router(state.clone()), state)
}

/// Serve `config` on an ephemeral local port. The server lives until the test runtime ends.
#[allow(dead_code)]
pub async fn spawn_service(config: Config) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Database::in_memory()).expect("Failed to build test state"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local addr");

    let served = state.clone();
    tokio::spawn(async move {
        songtrackpro::serve(listener, served, std::future::pending()).await
    });
    (addr, state)
}

/// Serve an arbitrary router on an ephemeral local port.
#[allow(dead_code)]
pub async fn spawn_router(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local addr");
    tokio::spawn(async move { axum::serve(listener, router).await });
    addr
}

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    email: String,
    tier: Tier,
    exp: usize,
    iat: usize,
}

fn now_secs() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

fn sign(claims: &TestClaims<'_>, signing_key: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key),
    )
    .unwrap()
}

/// Create a test JWT token valid for one hour.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, tier: Tier, signing_key: &[u8]) -> String {
    let now = now_secs();
    sign(
        &TestClaims {
            sub: user_id,
            email: format!("{}@example.com", user_id),
            tier,
            exp: now + 3600,
            iat: now,
        },
        signing_key,
    )
}

/// Create a JWT that expired an hour ago (well past validation leeway).
#[allow(dead_code)]
pub fn create_expired_jwt(user_id: &str, signing_key: &[u8]) -> String {
    let now = now_secs();
    sign(
        &TestClaims {
            sub: user_id,
            email: format!("{}@example.com", user_id),
            tier: Tier::Free,
            exp: now - 3600,
            iat: now - 7200,
        },
        signing_key,
    )
}

/// Store a user without a usable password (for routes that only check the JWT).
#[allow(dead_code)]
pub async fn insert_user(state: &AppState, id: &str, tier: Tier) -> User {
    let user = User {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        name: format!("User {}", id),
        password_hash: String::new(),
        tier,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    state.db.insert_user(&user).await.unwrap();
    user
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
