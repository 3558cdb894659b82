// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rate limiting tests.
//!
//! Requests sent with `oneshot` carry no peer address, so every anonymous
//! request in this file shares the `ip:unknown` key.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use songtrackpro::config::ServiceKind;
use songtrackpro::models::Tier;
use tower::ServiceExt;

mod common;

fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn login_request(email: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": "wrong-password" }).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_free_tier_limited_after_100_requests() {
    let (app, state) = common::create_test_app(ServiceKind::Meta);
    let token = common::create_test_jwt("free-user", Tier::Free, &state.config.jwt_signing_key);

    for i in 0..100 {
        let response = app
            .clone()
            .oneshot(authed_get("/accounts", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
        assert_eq!(response.headers()["ratelimit-limit"], "100");
        assert_eq!(
            response.headers()["ratelimit-remaining"],
            (99 - i).to_string().as_str()
        );
    }

    let response = app
        .clone()
        .oneshot(authed_get("/accounts", &token))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(response.headers()["ratelimit-remaining"], "0");
    assert_eq!(
        common::body_json(response).await,
        json!({
            "error": "Too many requests, please try again later.",
            "code": "RATE_LIMIT_EXCEEDED",
            "retryAfter": "1 hour"
        })
    );

    // Quotas are per user, not per address.
    let other = common::create_test_jwt("other-user", Tier::Free, &state.config.jwt_signing_key);
    let response = app.oneshot(authed_get("/accounts", &other)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_paid_tier_gets_larger_quota() {
    let (app, state) = common::create_test_app(ServiceKind::Analytics);
    let token = common::create_test_jwt("pro-user", Tier::Professional, &state.config.jwt_signing_key);

    let response = app.oneshot(authed_get("/campaigns", &token)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["ratelimit-limit"], "10000");
    assert_eq!(response.headers()["ratelimit-remaining"], "9999");
}

#[tokio::test]
async fn test_anonymous_requests_counted_by_address() {
    let (app, _) = common::create_test_app(ServiceKind::Spotify);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/accounts")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Counted against the free quota before authentication rejects it.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["ratelimit-limit"], "100");
    assert_eq!(response.headers()["ratelimit-remaining"], "99");
}

#[tokio::test]
async fn test_gateway_global_limit() {
    let (app, _) = common::create_test_app(ServiceKind::Gateway);

    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    // Rejections still carry the security headers.
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    let body = common::body_json(response).await;
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["retryAfter"], "15 minutes");
}

#[tokio::test]
async fn test_failed_logins_limited_successes_refunded() {
    let (app, _) = common::create_test_app(ServiceKind::Auth);

    // A successful registration does not use up an attempt.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({
                        "email": "artist@example.com",
                        "name": "Artist",
                        "password": "correct horse battery"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["ratelimit-remaining"], "5");

    for attempt in 1..=5 {
        let response = app
            .clone()
            .oneshot(login_request("nobody@example.com"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "attempt {}", attempt);
    }

    let response = app
        .clone()
        .oneshot(login_request("nobody@example.com"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = common::body_json(response).await;
    assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["retryAfter"], "15 minutes");

    // Refresh and logout are not behind the credential limiter.
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/logout")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "refreshToken": "unknown" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

// ─── Through the gateway over real sockets ───────────────────

/// Auth behind a gateway, both on loopback. Returns the gateway base URL.
async fn spawn_auth_behind_gateway() -> String {
    let (auth_addr, _) =
        common::spawn_service(songtrackpro::config::Config::test_for(ServiceKind::Auth)).await;

    let mut gateway = songtrackpro::config::Config::test_for(ServiceKind::Gateway);
    gateway.upstreams.auth = format!("http://{}", auth_addr);
    let (gateway_addr, _) = common::spawn_service(gateway).await;

    format!("http://{}", gateway_addr)
}

/// Client whose connections originate from `source` (any 127.0.0.0/8 address is local).
fn client_from(source: &str) -> reqwest::Client {
    reqwest::Client::builder()
        .local_address(source.parse::<std::net::IpAddr>().unwrap())
        .build()
        .unwrap()
}

async fn failed_login(
    client: &reqwest::Client,
    base: &str,
    forwarded_for: Option<&str>,
) -> reqwest::StatusCode {
    let mut request = client
        .post(format!("{}/auth/login", base))
        .json(&json!({ "email": "nobody@example.com", "password": "wrong-password" }));
    if let Some(value) = forwarded_for {
        request = request.header("x-forwarded-for", value);
    }
    request.send().await.unwrap().status()
}

#[tokio::test]
async fn test_distinct_sources_get_separate_auth_buckets_via_gateway() {
    let base = spawn_auth_behind_gateway().await;
    let first = client_from("127.0.0.1");
    let second = client_from("127.0.0.2");

    for i in 0..5 {
        assert_eq!(
            failed_login(&first, &base, None).await,
            reqwest::StatusCode::UNAUTHORIZED,
            "attempt {}",
            i + 1
        );
    }
    assert_eq!(
        failed_login(&first, &base, None).await,
        reqwest::StatusCode::TOO_MANY_REQUESTS
    );

    // Auth sees the gateway's peer, not the gateway itself.
    assert_eq!(
        failed_login(&second, &base, None).await,
        reqwest::StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_spoofed_forwarded_for_does_not_escape_limit_via_gateway() {
    let base = spawn_auth_behind_gateway().await;
    let client = client_from("127.0.0.3");

    for i in 0..5 {
        let spoofed = format!("10.9.9.{}", i);
        assert_eq!(
            failed_login(&client, &base, Some(&spoofed)).await,
            reqwest::StatusCode::UNAUTHORIZED,
            "attempt {}",
            i + 1
        );
    }
    assert_eq!(
        failed_login(&client, &base, Some("10.9.9.99")).await,
        reqwest::StatusCode::TOO_MANY_REQUESTS
    );
}
