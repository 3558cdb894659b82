// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gateway routes: service info plus prefix dispatch to upstream services.

use crate::error::{AppError, Result};
use crate::middleware::rate_limit::client_ip;
use crate::AppState;
use axum::{
    extract::{Request, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(service_info)).fallback(dispatch)
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub services: Vec<String>,
}

/// Describe the gateway and the prefixes it routes.
async fn service_info(State(state): State<Arc<AppState>>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: "SongTrackPro API Gateway".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services: state
            .routes
            .prefixes()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

/// Forward to the upstream owning the longest matching prefix, or 404.
async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Result<Response> {
    let path = request.uri().path().to_string();
    let target = state.routes.resolve(&path).ok_or_else(|| {
        tracing::debug!(path = %path, "No route for path");
        AppError::RouteNotFound
    })?;

    let trust_proxy = state.config.trust_proxy;
    let ip = client_ip(&request, trust_proxy);
    state.proxy.forward(&target, request, &ip, trust_proxy).await
}
