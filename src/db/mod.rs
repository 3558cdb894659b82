// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! [`Database`] is what handlers use. It is backed by MongoDB in production
//! and by the in-process [`MemoryDb`] in tests. The gateway stores nothing
//! and runs with a disconnected handle.

pub mod memory;
pub mod mongo;

pub use memory::MemoryDb;
pub use mongo::MongoDb;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::metrics::MetricsQuery;
use crate::models::{
    Campaign, LinkedAccount, MetaAdMetric, Platform, RefreshTokenRecord, SpotifyMetric, User,
};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const REFRESH_TOKENS: &str = "refreshTokens";
    pub const ACCOUNTS: &str = "accounts";
    pub const CAMPAIGNS: &str = "campaigns";
    pub const META_AD_METRICS: &str = crate::schema::META_AD_METRICS;
    pub const SPOTIFY_METRICS: &str = crate::schema::SPOTIFY_METRICS;
}

#[derive(Clone)]
enum Backend {
    Mongo(MongoDb),
    Memory(MemoryDb),
    Disconnected,
}

/// Storage handle shared by a service's handlers. Clones share the same store.
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

impl Database {
    /// Connect to MongoDB and apply validators and indexes.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let mongo = MongoDb::connect(uri, database).await?;
        mongo.initialize().await?;
        Ok(Self {
            backend: Backend::Mongo(mongo),
        })
    }

    /// In-process store for tests.
    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryDb::new()),
        }
    }

    /// Handle for processes without storage. Every operation fails.
    pub fn disconnected() -> Self {
        Self {
            backend: Backend::Disconnected,
        }
    }

    fn not_connected() -> AppError {
        AppError::Database("Database not connected".to_string())
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.insert_user(user).await,
            Backend::Memory(db) => db.insert_user(user),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.get_user(user_id).await,
            Backend::Memory(db) => Ok(db.get_user(user_id)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.find_user_by_email(email).await,
            Backend::Memory(db) => Ok(db.find_user_by_email(email)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.update_user(user).await,
            Backend::Memory(db) => db.update_user(user),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    // ─── Refresh Token Operations ────────────────────────────────

    pub async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.insert_refresh_token(record).await,
            Backend::Memory(db) => {
                db.insert_refresh_token(record);
                Ok(())
            }
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn get_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.get_refresh_token(token_hash).await,
            Backend::Memory(db) => Ok(db.get_refresh_token(token_hash)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    /// Mark a token revoked. Returns the record as it was before, if it was active.
    pub async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        replaced_by: Option<String>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.revoke_refresh_token(token_hash, now, replaced_by).await,
            Backend::Memory(db) => Ok(db.revoke_refresh_token(token_hash, now, replaced_by)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    /// Drop tokens that expired before `now`. A disconnected handle has nothing to purge.
    pub async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.purge_expired_tokens(now).await,
            Backend::Memory(db) => Ok(db.purge_expired_tokens(now)),
            Backend::Disconnected => Ok(0),
        }
    }

    // ─── Account Operations ──────────────────────────────────────

    pub async fn insert_account(&self, account: &LinkedAccount) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.insert_account(account).await,
            Backend::Memory(db) => {
                db.insert_account(account);
                Ok(())
            }
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn list_accounts(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Vec<LinkedAccount>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.list_accounts(user_id, platform).await,
            Backend::Memory(db) => Ok(db.list_accounts(user_id, platform)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn disconnect_account(
        &self,
        user_id: &str,
        platform: Platform,
        account_id: &str,
    ) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.disconnect_account(user_id, platform, account_id).await,
            Backend::Memory(db) => db.disconnect_account(user_id, platform, account_id),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    // ─── Campaign Operations ─────────────────────────────────────

    pub async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.insert_campaign(campaign).await,
            Backend::Memory(db) => {
                db.insert_campaign(campaign);
                Ok(())
            }
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn get_campaign(
        &self,
        user_id: &str,
        campaign_id: &str,
    ) -> Result<Option<Campaign>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.get_campaign(user_id, campaign_id).await,
            Backend::Memory(db) => Ok(db.get_campaign(user_id, campaign_id)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn list_campaigns(&self, user_id: &str) -> Result<Vec<Campaign>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.list_campaigns(user_id).await,
            Backend::Memory(db) => Ok(db.list_campaigns(user_id)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn update_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.update_campaign(campaign).await,
            Backend::Memory(db) => db.update_campaign(campaign),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    // ─── Metric Operations ───────────────────────────────────────

    pub async fn insert_meta_metric(&self, metric: &MetaAdMetric) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.insert_meta_metric(metric).await,
            Backend::Memory(db) => db.insert_meta_metric(metric),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn insert_spotify_metric(&self, metric: &SpotifyMetric) -> Result<(), AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.insert_spotify_metric(metric).await,
            Backend::Memory(db) => db.insert_spotify_metric(metric),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn query_meta_metrics(
        &self,
        query: &MetricsQuery,
    ) -> Result<Vec<MetaAdMetric>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.query_meta_metrics(query).await,
            Backend::Memory(db) => Ok(db.query_meta_metrics(query)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }

    pub async fn query_spotify_metrics(
        &self,
        query: &MetricsQuery,
    ) -> Result<Vec<SpotifyMetric>, AppError> {
        match &self.backend {
            Backend::Mongo(db) => db.query_spotify_metrics(query).await,
            Backend::Memory(db) => Ok(db.query_spotify_metrics(query)),
            Backend::Disconnected => Err(Self::not_connected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disconnected_store_fails_cleanly() {
        let db = Database::disconnected();
        assert!(matches!(
            db.get_user("u1").await,
            Err(AppError::Database(_))
        ));
        assert_eq!(db.purge_expired_tokens(Utc::now()).await.unwrap(), 0);
    }
}
