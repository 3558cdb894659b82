// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth service routes: registration, login, token refresh, profile.

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{require_auth, AuthUser};
use crate::middleware::rate_limit::enforce;
use crate::models::token::{AuthResponse, RefreshRequest, TokensResponse};
use crate::models::user::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::models::{Tier, User, UserProfile};
use crate::routes::extract::ValidatedJson;
use crate::services::password::{
    hash_password_blocking, verify_dummy_blocking, verify_password_blocking,
};
use crate::AppState;

pub fn routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    // Failed credential attempts are throttled; successful ones are refunded.
    let credential_routes = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.limits.auth.clone(),
            enforce,
        ));

    let session_routes = Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout));

    let profile_routes = Router::new()
        .route("/me", get(get_me).patch(update_me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    credential_routes.merge(session_routes).merge(profile_routes)
}

/// Create an account and sign it in.
async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let email = req.email.trim().to_lowercase();
    if state.db.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(format!("{} already registered", email)));
    }

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email,
        name: req.name,
        password_hash: hash_password_blocking(req.password).await?,
        tier: Tier::Free,
        created_at: now,
        updated_at: now,
    };
    state.db.insert_user(&user).await?;

    let tokens = state.sessions.issue(&user).await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserProfile::from(&user),
            tokens,
        }),
    ))
}

/// Exchange email + password for a session.
async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let email = req.email.trim().to_lowercase();
    let Some(user) = state.db.find_user_by_email(&email).await? else {
        verify_dummy_blocking(req.password).await?;
        tracing::info!("Login attempt for unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(req.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = %user.id, "Login attempt with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let tokens = state.sessions.issue(&user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse {
        user: UserProfile::from(&user),
        tokens,
    }))
}

/// Rotate a refresh token.
async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<TokensResponse>> {
    let (_, tokens) = state.sessions.rotate(&req.refresh_token).await?;
    Ok(Json(TokensResponse { tokens }))
}

/// Revoke a refresh token. Unknown or already revoked tokens are not an error.
async fn logout(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<StatusCode> {
    state.sessions.revoke(&req.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct ProfileResponse {
    user: UserProfile,
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", auth.user_id)))?;

    Ok(Json(ProfileResponse {
        user: UserProfile::from(&user),
    }))
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    let mut user = state
        .db
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", auth.user_id)))?;

    user.name = req.name;
    user.updated_at = Utc::now();
    state.db.update_user(&user).await?;

    Ok(Json(ProfileResponse {
        user: UserProfile::from(&user),
    }))
}
