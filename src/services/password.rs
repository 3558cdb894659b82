// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and verification using argon2id.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use ring::rand::{SecureRandom, SystemRandom};
use tokio::sync::OnceCell;

use crate::error::AppError;

/// Hash a password using argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut salt_bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG unavailable")))?;

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("salt encoding failed: {}", e)))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// [`hash_password`] off the async runtime.
pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

/// [`verify_password`] off the async runtime.
pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();

/// Spend the same work as a real verification when there is no stored hash.
///
/// Login runs this for unknown emails so response time does not reveal
/// which addresses are registered. Always reports a mismatch.
pub async fn verify_dummy_blocking(password: String) -> Result<bool, AppError> {
    let hash = DUMMY_HASH
        .get_or_try_init(|| hash_password_blocking("songtrackpro-unused".to_string()))
        .await?
        .clone();
    verify_password_blocking(password, hash).await?;
    Ok(false)
}
