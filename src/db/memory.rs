// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store with the same operations as [`crate::db::MongoDb`].
//!
//! Provides high-level operations for:
//! - Users (unique by lowercased email)
//! - Refresh tokens (keyed by token hash)
//! - Linked platform accounts
//! - Campaigns
//! - Metric snapshots (unique per campaign, day and ad/track)
//!
//! Used as the test store; state lives only as long as the process.

use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::db::collections;
use crate::error::AppError;
use crate::models::metrics::MetricsQuery;
use crate::models::{
    Campaign, LinkedAccount, MetaAdMetric, Platform, RefreshTokenRecord, SpotifyMetric, User,
};

type MetricKey = (String, NaiveDate, String);

#[derive(Default)]
struct Collections {
    users: DashMap<String, User>,
    users_by_email: DashMap<String, String>,
    refresh_tokens: DashMap<String, RefreshTokenRecord>,
    accounts: DashMap<String, LinkedAccount>,
    campaigns: DashMap<String, Campaign>,
    meta_metrics: DashMap<MetricKey, MetaAdMetric>,
    spotify_metrics: DashMap<MetricKey, SpotifyMetric>,
}

/// Document store handle. Clones share the same collections.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Collections>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Insert a new user; fails with `Conflict` if the email is taken.
    pub fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let email_key = user.email.to_lowercase();
        match self.inner.users_by_email.entry(email_key) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "{} already registered",
                user.email
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
                self.inner.users.insert(user.id.clone(), user.clone());
                tracing::debug!(collection = collections::USERS, user_id = %user.id, "Inserted user");
                Ok(())
            }
        }
    }

    pub fn get_user(&self, user_id: &str) -> Option<User> {
        self.inner.users.get(user_id).map(|u| u.clone())
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<User> {
        let id = self
            .inner
            .users_by_email
            .get(&email.to_lowercase())
            .map(|id| id.clone())?;
        self.get_user(&id)
    }

    /// Replace a stored user. Email changes are not supported.
    pub fn update_user(&self, user: &User) -> Result<(), AppError> {
        match self.inner.users.get_mut(&user.id) {
            Some(mut stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {}", user.id))),
        }
    }

    // ─── Refresh Token Operations ────────────────────────────────

    pub fn insert_refresh_token(&self, record: &RefreshTokenRecord) {
        self.inner
            .refresh_tokens
            .insert(record.token_hash.clone(), record.clone());
        tracing::debug!(collection = collections::REFRESH_TOKENS, user_id = %record.user_id, "Stored refresh token");
    }

    pub fn get_refresh_token(&self, token_hash: &str) -> Option<RefreshTokenRecord> {
        self.inner.refresh_tokens.get(token_hash).map(|r| r.clone())
    }

    /// Mark a token revoked. Returns the record as it was before, if it was active.
    ///
    /// Check-and-revoke happens under the entry lock, so two concurrent
    /// refreshes with the same token cannot both succeed.
    pub fn revoke_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        replaced_by: Option<String>,
    ) -> Option<RefreshTokenRecord> {
        let mut record = self.inner.refresh_tokens.get_mut(token_hash)?;
        if !record.is_active(now) {
            return None;
        }
        let before = record.clone();
        record.revoked_at = Some(now);
        record.replaced_by = replaced_by;
        Some(before)
    }

    /// Drop tokens that expired before `now`.
    pub fn purge_expired_tokens(&self, now: DateTime<Utc>) -> usize {
        let before = self.inner.refresh_tokens.len();
        self.inner.refresh_tokens.retain(|_, r| r.expires_at > now);
        before.saturating_sub(self.inner.refresh_tokens.len())
    }

    // ─── Account Operations ──────────────────────────────────────

    pub fn insert_account(&self, account: &LinkedAccount) {
        self.inner
            .accounts
            .insert(account.id.clone(), account.clone());
        tracing::debug!(collection = collections::ACCOUNTS, account_id = %account.id, "Inserted account");
    }

    pub fn list_accounts(&self, user_id: &str, platform: Platform) -> Vec<LinkedAccount> {
        let mut accounts: Vec<LinkedAccount> = self
            .inner
            .accounts
            .iter()
            .filter(|a| a.user_id == user_id && a.platform == platform)
            .map(|a| a.clone())
            .collect();
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        accounts
    }

    /// Mark an account disconnected and forget its tokens.
    pub fn disconnect_account(
        &self,
        user_id: &str,
        platform: Platform,
        account_id: &str,
    ) -> Result<(), AppError> {
        match self.inner.accounts.get_mut(account_id) {
            Some(mut account) if account.user_id == user_id && account.platform == platform => {
                account.connected = false;
                account.access_token.clear();
                account.refresh_token = None;
                Ok(())
            }
            _ => Err(AppError::NotFound(format!("Account {}", account_id))),
        }
    }

    // ─── Campaign Operations ─────────────────────────────────────

    pub fn insert_campaign(&self, campaign: &Campaign) {
        self.inner
            .campaigns
            .insert(campaign.id.clone(), campaign.clone());
        tracing::debug!(collection = collections::CAMPAIGNS, campaign_id = %campaign.id, "Inserted campaign");
    }

    /// Get a campaign owned by `user_id`. Other users' campaigns look absent.
    pub fn get_campaign(&self, user_id: &str, campaign_id: &str) -> Option<Campaign> {
        self.inner
            .campaigns
            .get(campaign_id)
            .filter(|c| c.user_id == user_id)
            .map(|c| c.clone())
    }

    pub fn list_campaigns(&self, user_id: &str) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> = self
            .inner
            .campaigns
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.clone())
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn update_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        match self.inner.campaigns.get_mut(&campaign.id) {
            Some(mut stored) if stored.user_id == campaign.user_id => {
                *stored = campaign.clone();
                Ok(())
            }
            _ => Err(AppError::NotFound(format!("Campaign {}", campaign.id))),
        }
    }

    // ─── Metric Operations ───────────────────────────────────────

    /// Append a Meta snapshot; `(campaignId, date, adId)` must be new.
    pub fn insert_meta_metric(&self, metric: &MetaAdMetric) -> Result<(), AppError> {
        let key = (metric.campaign_id.clone(), metric.date, metric.ad_id.clone());
        insert_unique(collections::META_AD_METRICS, &self.inner.meta_metrics, key, metric.clone())
    }

    /// Append a Spotify snapshot; `(campaignId, date, trackId)` must be new.
    pub fn insert_spotify_metric(&self, metric: &SpotifyMetric) -> Result<(), AppError> {
        let key = (metric.campaign_id.clone(), metric.date, metric.track_id.clone());
        insert_unique(collections::SPOTIFY_METRICS, &self.inner.spotify_metrics, key, metric.clone())
    }

    /// Meta snapshots for a campaign, newest day first.
    pub fn query_meta_metrics(&self, query: &MetricsQuery) -> Vec<MetaAdMetric> {
        let mut metrics: Vec<MetaAdMetric> = self
            .inner
            .meta_metrics
            .iter()
            .filter(|m| m.campaign_id == query.campaign_id && query.contains(m.date))
            .map(|m| m.clone())
            .collect();
        metrics.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.ad_id.cmp(&b.ad_id)));
        metrics
    }

    /// Spotify snapshots for a campaign, newest day first.
    pub fn query_spotify_metrics(&self, query: &MetricsQuery) -> Vec<SpotifyMetric> {
        let mut metrics: Vec<SpotifyMetric> = self
            .inner
            .spotify_metrics
            .iter()
            .filter(|m| m.campaign_id == query.campaign_id && query.contains(m.date))
            .map(|m| m.clone())
            .collect();
        metrics.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.track_id.cmp(&b.track_id)));
        metrics
    }
}

fn insert_unique<V>(
    collection: &'static str,
    map: &DashMap<MetricKey, V>,
    key: MetricKey,
    value: V,
) -> Result<(), AppError> {
    match map.entry(key) {
        Entry::Occupied(entry) => {
            let (campaign, date, id) = entry.key();
            Err(AppError::Conflict(format!(
                "{} snapshot for campaign {} on {} ({}) already recorded",
                collection, campaign, date, id
            )))
        }
        Entry::Vacant(slot) => {
            tracing::debug!(collection, key = ?slot.key(), "Inserted snapshot");
            slot.insert(value);
            Ok(())
        }
    }
}
