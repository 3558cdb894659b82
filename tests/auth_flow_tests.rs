// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth service tests: registration, login, refresh rotation, logout, profile.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use songtrackpro::config::ServiceKind;
use songtrackpro::middleware::auth::ACCESS_TOKEN_COOKIE;
use tower::ServiceExt;

mod common;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn register(app: &Router, email: &str) -> Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/register",
            json!({ "email": email, "name": "  Band Name ", "password": "correct horse battery" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    common::body_json(response).await
}

async fn refresh(app: &Router, refresh_token: &str) -> axum::response::Response {
    app.clone()
        .oneshot(post_json("/refresh", json!({ "refreshToken": refresh_token })))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_register_refresh_logout_flow() {
    let (app, _) = common::create_test_app(ServiceKind::Auth);

    let body = register(&app, "Band@Example.com").await;
    assert_eq!(body["user"]["email"], "band@example.com");
    assert_eq!(body["user"]["name"], "Band Name");
    assert_eq!(body["user"]["tier"], "free");
    assert!(body["user"].get("passwordHash").is_none());
    assert_eq!(body["tokens"]["tokenType"], "Bearer");
    assert_eq!(body["tokens"]["expiresIn"], 900);

    let access = body["tokens"]["accessToken"].as_str().unwrap().to_string();
    let first_refresh = body["tokens"]["refreshToken"].as_str().unwrap().to_string();

    // Profile with the bearer token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        common::body_json(response).await["user"]["email"],
        "band@example.com"
    );

    // Rotation issues a new refresh token and retires the old one
    let response = refresh(&app, &first_refresh).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = common::body_json(response).await;
    let second_refresh = rotated["tokens"]["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(second_refresh, first_refresh);

    let response = refresh(&app, &first_refresh).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::body_json(response).await["code"], "invalid_token");

    // Logout revokes the current token
    let response = app
        .clone()
        .oneshot(post_json("/logout", json!({ "refreshToken": second_refresh })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = refresh(&app, &second_refresh).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let (app, _) = common::create_test_app(ServiceKind::Auth);
    register(&app, "dup@example.com").await;

    let response = app
        .oneshot(post_json(
            "/register",
            json!({ "email": "DUP@example.com", "name": "Again", "password": "another password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(common::body_json(response).await["code"], "conflict");
}

#[tokio::test]
async fn test_register_validation() {
    let (app, _) = common::create_test_app(ServiceKind::Auth);

    let response = app
        .clone()
        .oneshot(post_json(
            "/register",
            json!({ "email": "not-an-email", "name": "X", "password": "short" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = common::body_json(response).await;
    assert_eq!(body["code"], "validation_failed");
    let details = body["details"].as_str().unwrap();
    assert!(details.contains("email"), "got {details}");
    assert!(details.contains("password"), "got {details}");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_json(response).await["code"], "bad_request");
}

#[tokio::test]
async fn test_login_checks_password() {
    let (app, _) = common::create_test_app(ServiceKind::Auth);
    register(&app, "login@example.com").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            json!({ "email": "login@example.com", "password": "wrong password" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        common::body_json(response).await["code"],
        "invalid_credentials"
    );

    let response = app
        .oneshot(post_json(
            "/login",
            json!({ "email": "LOGIN@example.com", "password": "correct horse battery" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;
    assert_eq!(body["user"]["email"], "login@example.com");
    assert!(body["tokens"]["accessToken"].as_str().is_some());
}

#[tokio::test]
async fn test_profile_requires_valid_token() {
    let (app, state) = common::create_test_app(ServiceKind::Auth);
    let key = state.config.jwt_signing_key.clone();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::body_json(response).await["code"], "unauthorized");

    let expired = common::create_expired_jwt("someone", &key);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", expired))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(common::body_json(response).await["code"], "invalid_token");

    let forged = common::create_test_jwt("someone", Default::default(), b"another-key-another-key-another!");
    let response = app
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_update_via_cookie() {
    let (app, state) = common::create_test_app(ServiceKind::Auth);
    let user = common::insert_user(&state, "cookie-user", Default::default()).await;
    let token = common::create_test_jwt(&user.id, user.tier, &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PATCH)
                .uri("/me")
                .header(header::COOKIE, format!("{}={}", ACCESS_TOKEN_COOKIE, token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "name": "Renamed" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await["user"]["name"], "Renamed");
    assert_eq!(state.db.get_user(&user.id).await.unwrap().unwrap().name, "Renamed");
}

#[tokio::test]
async fn test_blank_names_rejected() {
    let (app, state) = common::create_test_app(ServiceKind::Auth);

    let response = app
        .clone()
        .oneshot(post_json(
            "/register",
            json!({ "email": "blank@example.com", "name": "   ", "password": "correct horse battery" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_json(response).await["code"], "validation_failed");
    assert!(state
        .db
        .find_user_by_email("blank@example.com")
        .await
        .unwrap()
        .is_none());

    let user = common::insert_user(&state, "blank-rename", Default::default()).await;
    let token = common::create_test_jwt(&user.id, user.tier, &state.config.jwt_signing_key);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::PATCH)
                .uri("/me")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "name": " \t " }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        state.db.get_user(&user.id).await.unwrap().unwrap().name,
        "User blank-rename"
    );
}

#[tokio::test]
async fn test_unknown_email_rejected_like_wrong_password() {
    let (app, _) = common::create_test_app(ServiceKind::Auth);
    register(&app, "known@example.com").await;

    let unknown = app
        .clone()
        .oneshot(post_json(
            "/login",
            json!({ "email": "unknown@example.com", "password": "correct horse battery" }),
        ))
        .await
        .unwrap();
    let wrong = app
        .oneshot(post_json(
            "/login",
            json!({ "email": "known@example.com", "password": "not the password" }),
        ))
        .await
        .unwrap();

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        common::body_json(unknown).await,
        common::body_json(wrong).await
    );
}
