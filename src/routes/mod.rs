// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod analytics;
pub mod auth;
pub mod extract;
pub mod gateway;
pub mod meta;
pub mod platform;
pub mod spotify;

use crate::config::ServiceKind;
use crate::middleware::auth::{identify, require_auth};
use crate::middleware::rate_limit::{enforce, enforce_tiered};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::http::{header, Method};
use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

/// Health check response
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: state.config.service.name().to_string(),
        timestamp: format_utc_rfc3339(chrono::Utc::now()),
    })
}

/// Wrap routes that need a signed-in caller.
///
/// Layers run identify → tiered rate limit → require_auth, so quotas are
/// keyed by user when a valid token is present and by IP otherwise.
fn protected(router: Router<Arc<AppState>>, state: &Arc<AppState>) -> Router<Arc<AppState>> {
    router
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route_layer(middleware::from_fn_with_state(
            state.limits.tiered.clone(),
            enforce_tiered,
        ))
        .route_layer(middleware::from_fn_with_state(state.clone(), identify))
}

/// Build the complete router for the configured service.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let service_routes = match state.config.service {
        ServiceKind::Gateway => gateway::routes(),
        ServiceKind::Auth => auth::routes(&state),
        ServiceKind::Meta => protected(meta::routes(), &state),
        ServiceKind::Spotify => protected(spotify::routes(), &state),
        ServiceKind::Analytics => protected(analytics::routes(), &state),
    };

    let mut router = Router::new()
        .route("/health", get(health_check))
        .merge(service_routes);

    // Gateway-wide limit sits inside logging so rejected requests are still traced.
    if state.config.service == ServiceKind::Gateway {
        router = router.layer(middleware::from_fn_with_state(
            state.limits.global.clone(),
            enforce,
        ));
    }

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(middleware::from_fn(
            crate::middleware::security::add_security_headers,
        ))
        .with_state(state)
}
