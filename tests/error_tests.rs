// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use serde_json::json;
use songtrackpro::error::{describe_window, AppError};
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_rate_limited_response_shape() {
    let response = AppError::RateLimited {
        window: Duration::from_secs(900),
        retry_after: Duration::from_secs(120),
    }
    .into_response();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "120");
    assert_eq!(
        common::body_json(response).await,
        json!({
            "error": "Too many requests, please try again later.",
            "code": AppError::RATE_LIMIT_EXCEEDED,
            "retryAfter": "15 minutes"
        })
    );
}

#[tokio::test]
async fn test_route_not_found_has_bare_body() {
    let response = AppError::RouteNotFound.into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(common::body_json(response).await, json!({ "error": "Not found" }));
}

#[tokio::test]
async fn test_internal_error_hides_cause() {
    let response = AppError::Internal(anyhow::anyhow!("db password is hunter2")).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = common::body_json(response).await;
    assert_eq!(body["code"], "internal_error");
    assert!(!body.to_string().contains("hunter2"));
}

#[tokio::test]
async fn test_database_error_hides_cause() {
    let response =
        AppError::Database("connection to mongo-0:27017 refused".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = common::body_json(response).await;
    assert_eq!(body["code"], "database_error");
    assert!(!body.to_string().contains("mongo-0"));
}

#[test]
fn test_status_mapping() {
    assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
    assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        AppError::Upstream {
            service: "meta".into(),
            reason: "refused".into()
        }
        .status(),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn test_describe_window() {
    assert_eq!(describe_window(Duration::from_secs(900)), "15 minutes");
    assert_eq!(describe_window(Duration::from_secs(3600)), "1 hour");
    assert_eq!(describe_window(Duration::from_secs(7200)), "2 hours");
    assert_eq!(describe_window(Duration::from_secs(60)), "1 minute");
    assert_eq!(describe_window(Duration::from_secs(45)), "45 seconds");
}
