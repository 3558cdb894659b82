// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session issuance: access JWTs plus rotating opaque refresh tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::db::Database;
use crate::error::AppError;
use crate::middleware::auth::create_access_token;
use crate::models::{RefreshTokenRecord, TokenPair, User};

const REFRESH_TOKEN_BYTES: usize = 32;

/// Fresh random refresh token (base64url, 43 chars).
pub fn generate_refresh_token() -> Result<String, AppError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG unavailable")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Storage key for a refresh token.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Issues and rotates sessions against the user store.
#[derive(Clone)]
pub struct SessionService {
    db: Database,
    config: Config,
}

impl SessionService {
    pub fn new(db: Database, config: Config) -> Self {
        Self { db, config }
    }

    /// New access + refresh token pair for `user`.
    pub async fn issue(&self, user: &User) -> Result<TokenPair, AppError> {
        let (pair, _) = self.issue_with_hash(user).await?;
        Ok(pair)
    }

    async fn issue_with_hash(&self, user: &User) -> Result<(TokenPair, String), AppError> {
        let access_token = create_access_token(
            user,
            &self.config.jwt_signing_key,
            self.config.access_token_ttl,
        )?;

        let refresh_token = generate_refresh_token()?;
        let token_hash = hash_refresh_token(&refresh_token);
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.config.refresh_token_ttl)
            .map_err(|e| AppError::Internal(e.into()))?;

        self.db
            .insert_refresh_token(&RefreshTokenRecord {
                token_hash: token_hash.clone(),
                user_id: user.id.clone(),
                created_at: now,
                expires_at: now + ttl,
                revoked_at: None,
                replaced_by: None,
            })
            .await?;

        Ok((
            TokenPair {
                access_token,
                refresh_token,
                token_type: "Bearer".to_string(),
                expires_in: self.config.access_token_ttl.as_secs(),
            },
            token_hash,
        ))
    }

    /// Exchange a refresh token for a new pair. The presented token is revoked.
    pub async fn rotate(&self, presented: &str) -> Result<(User, TokenPair), AppError> {
        let now = Utc::now();
        let presented_hash = hash_refresh_token(presented);

        let record = self
            .db
            .get_refresh_token(&presented_hash)
            .await?
            .filter(|r| r.is_active(now))
            .ok_or(AppError::InvalidToken)?;
        let user = self
            .db
            .get_user(&record.user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;

        let (pair, new_hash) = self.issue_with_hash(&user).await?;

        // Lost a race with a concurrent rotation or logout: discard what we issued.
        if self
            .db
            .revoke_refresh_token(&presented_hash, now, Some(new_hash.clone()))
            .await?
            .is_none()
        {
            self.db.revoke_refresh_token(&new_hash, now, None).await?;
            return Err(AppError::InvalidToken);
        }

        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok((user, pair))
    }

    /// Revoke a refresh token. Unknown or already revoked tokens are ignored.
    pub async fn revoke(&self, presented: &str) -> Result<(), AppError> {
        let hash = hash_refresh_token(presented);
        if let Some(record) = self.db.revoke_refresh_token(&hash, Utc::now(), None).await? {
            tracing::info!(user_id = %record.user_id, "Refresh token revoked");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::verify_access_token;
    use crate::models::Tier;

    async fn setup() -> (SessionService, User) {
        let db = Database::in_memory();
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            email: "band@example.com".to_string(),
            name: "Band".to_string(),
            password_hash: String::new(),
            tier: Tier::Starter,
            created_at: now,
            updated_at: now,
        };
        db.insert_user(&user).await.unwrap();
        (SessionService::new(db, Config::test_default()), user)
    }

    #[test]
    fn test_refresh_token_shape() {
        let token = generate_refresh_token().unwrap();
        assert_eq!(token.len(), 43);
        assert_eq!(hash_refresh_token(&token).len(), 64);
        assert_ne!(token, generate_refresh_token().unwrap());
    }

    #[tokio::test]
    async fn test_issue_produces_verifiable_access_token() {
        let (sessions, user) = setup().await;
        let pair = sessions.issue(&user).await.unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 900);
        let claims =
            verify_access_token(&pair.access_token, &Config::test_default().jwt_signing_key)
                .unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.tier, Tier::Starter);
    }

    #[tokio::test]
    async fn test_rotation_invalidates_previous_token() {
        let (sessions, user) = setup().await;
        let first = sessions.issue(&user).await.unwrap();

        let (rotated_user, second) = sessions.rotate(&first.refresh_token).await.unwrap();
        assert_eq!(rotated_user.id, "u1");
        assert_ne!(first.refresh_token, second.refresh_token);

        assert!(matches!(
            sessions.rotate(&first.refresh_token).await,
            Err(AppError::InvalidToken)
        ));
        assert!(sessions.rotate(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_refresh() {
        let (sessions, user) = setup().await;
        let pair = sessions.issue(&user).await.unwrap();
        sessions.revoke(&pair.refresh_token).await.unwrap();
        sessions.revoke(&pair.refresh_token).await.unwrap();

        assert!(sessions.rotate(&pair.refresh_token).await.is_err());
        assert!(sessions.rotate("never-issued").await.is_err());
    }
}
