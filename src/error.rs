// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Forbidden")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// No gateway route matched the request path.
    #[error("Not found")]
    RouteNotFound,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Rate limit exceeded")]
    RateLimited { window: Duration, retry_after: Duration },

    #[error("Upstream {service} unavailable: {reason}")]
    Upstream { service: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<String>,
}

impl ErrorResponse {
    fn new(error: &str, code: &'static str) -> Self {
        Self {
            error: error.to_string(),
            code: Some(code),
            details: None,
            retry_after: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl AppError {
    /// Machine-readable code carried in the `code` field of the body.
    pub const RATE_LIMIT_EXCEEDED: &'static str = "RATE_LIMIT_EXCEEDED";

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidToken | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut retry_after_secs = None;

        let body = match &self {
            AppError::Unauthorized => ErrorResponse::new("Authentication required", "unauthorized"),
            AppError::InvalidToken => ErrorResponse::new("Invalid or expired token", "invalid_token"),
            AppError::InvalidCredentials => {
                ErrorResponse::new("Invalid email or password", "invalid_credentials")
            }
            AppError::Forbidden => ErrorResponse::new("Forbidden", "forbidden"),
            AppError::NotFound(what) => {
                ErrorResponse::new("Resource not found", "not_found").with_details(what.clone())
            }
            AppError::RouteNotFound => ErrorResponse {
                error: "Not found".to_string(),
                code: None,
                details: None,
                retry_after: None,
            },
            AppError::BadRequest(msg) => {
                ErrorResponse::new("Invalid request", "bad_request").with_details(msg.clone())
            }
            AppError::Validation(msg) => {
                ErrorResponse::new("Validation failed", "validation_failed").with_details(msg.clone())
            }
            AppError::Conflict(msg) => {
                ErrorResponse::new("Conflict", "conflict").with_details(msg.clone())
            }
            AppError::PayloadTooLarge => {
                ErrorResponse::new("Request body too large", "payload_too_large")
            }
            AppError::RateLimited {
                window,
                retry_after,
            } => {
                retry_after_secs = Some(retry_after.as_secs().max(1));
                ErrorResponse {
                    error: "Too many requests, please try again later.".to_string(),
                    code: Some(Self::RATE_LIMIT_EXCEEDED),
                    details: None,
                    retry_after: Some(describe_window(*window)),
                }
            }
            AppError::Upstream { service, reason } => {
                tracing::warn!(service = %service, reason = %reason, "Upstream request failed");
                ErrorResponse::new("Bad gateway", "UPSTREAM_UNAVAILABLE").with_details(service.clone())
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ErrorResponse::new("Internal server error", "database_error")
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ErrorResponse::new("Internal server error", "internal_error")
            }
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Render a window length the way clients see it in `retryAfter`.
pub fn describe_window(window: Duration) -> String {
    let secs = window.as_secs();
    let plural = |n: u64, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };

    if secs >= 3600 && secs % 3600 == 0 {
        plural(secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        plural(secs / 60, "minute")
    } else {
        plural(secs, "second")
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
