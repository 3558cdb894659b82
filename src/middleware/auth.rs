// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware.

use crate::error::AppError;
use crate::models::{Tier, User};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cookie the frontend may use instead of an `Authorization` header.
pub const ACCESS_TOKEN_COOKIE: &str = "stp_token";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub tier: Tier,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
    pub tier: Tier,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            tier: claims.tier,
        }
    }
}

/// Pull the access token from the cookie or the bearer header.
fn extract_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Decode and verify an access token.
pub fn verify_access_token(token: &str, signing_key: &[u8]) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(signing_key);
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
}

/// Attach an [`AuthUser`] when the request carries a valid token. Never rejects.
///
/// Runs ahead of the tiered rate limiter so quotas are keyed by user when possible.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(&jar, &request) {
        match verify_access_token(&token, &state.config.jwt_signing_key) {
            Ok(claims) => {
                request.extensions_mut().insert(AuthUser::from(claims));
            }
            Err(_) => tracing::debug!("Ignoring invalid access token during identification"),
        }
    }

    next.run(request).await
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if request.extensions().get::<AuthUser>().is_none() {
        let token = extract_token(&jar, &request).ok_or(AppError::Unauthorized)?;
        let claims = verify_access_token(&token, &state.config.jwt_signing_key)?;
        request.extensions_mut().insert(AuthUser::from(claims));
    }

    Ok(next.run(request).await)
}

/// Create an access token for a user session.
pub fn create_access_token(user: &User, signing_key: &[u8], ttl: Duration) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        tier: user.tier,
        iat: now,
        exp: now + ttl.as_secs() as usize,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        User {
            id: "u-42".to_string(),
            email: "dj@example.com".to_string(),
            name: "DJ".to_string(),
            password_hash: String::new(),
            tier: Tier::Professional,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_roundtrip_carries_tier() {
        let key = b"test_signing_key_32_bytes_long!!";
        let token = create_access_token(&user(), key, Duration::from_secs(900)).unwrap();
        let claims = verify_access_token(&token, key).unwrap();

        assert_eq!(claims.sub, "u-42");
        assert_eq!(claims.tier, Tier::Professional);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token =
            create_access_token(&user(), b"key-one-key-one-key-one-key-one", Duration::from_secs(60))
                .unwrap();
        let err = verify_access_token(&token, b"key-two-key-two-key-two-key-two").unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }
}
