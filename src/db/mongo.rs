// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! MongoDB client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (unique by lowercased email)
//! - Refresh tokens (keyed by token hash, expired by a TTL index)
//! - Linked platform accounts
//! - Campaigns
//! - Metric snapshots (validated by `$jsonSchema`, unique per campaign, day and ad/track)

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::db::collections;
use crate::error::AppError;
use crate::models::metrics::MetricsQuery;
use crate::models::{
    Campaign, LinkedAccount, MetaAdMetric, Platform, RefreshTokenRecord, SpotifyMetric, User,
};
use crate::schema::{self, CollectionSpec, IndexSpec};

const DUPLICATE_KEY: i32 = 11000;
const NAMESPACE_EXISTS: i32 = 48;

/// MongoDB database handle. Clones share the same connection pool.
#[derive(Clone)]
pub struct MongoDb {
    db: mongodb::Database,
}

impl MongoDb {
    /// Connect and check the server answers.
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to MongoDB: {}", e)))?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::Database(format!("MongoDB ping failed: {}", e)))?;

        tracing::info!(database, "Connected to MongoDB");
        Ok(Self { db })
    }

    /// Create collections, validators and indexes. Runs on every start.
    pub async fn initialize(&self) -> Result<(), AppError> {
        for spec in schema::collection_specs() {
            self.apply_collection_spec(&spec).await?;
        }

        create_indexes(
            &self.users(),
            vec![
                unique_index(doc! { "id": 1 }, "id_1"),
                unique_index(doc! { "email": 1 }, "email_1"),
            ],
        )
        .await?;
        create_indexes(
            &self.refresh_tokens(),
            vec![
                unique_index(doc! { "tokenHash": 1 }, "tokenHash_1"),
                IndexModel::builder()
                    .keys(doc! { "expiresAt": 1 })
                    .options(
                        IndexOptions::builder()
                            .name("expiresAt_ttl".to_string())
                            .expire_after(Duration::ZERO)
                            .build(),
                    )
                    .build(),
            ],
        )
        .await?;
        create_indexes(
            &self.accounts(),
            vec![
                unique_index(doc! { "id": 1 }, "id_1"),
                index(doc! { "userId": 1, "platform": 1 }, "userId_1_platform_1"),
            ],
        )
        .await?;
        create_indexes(
            &self.campaigns(),
            vec![
                unique_index(doc! { "id": 1 }, "id_1"),
                index(doc! { "userId": 1, "createdAt": -1 }, "userId_1_createdAt_-1"),
            ],
        )
        .await?;

        tracing::info!("MongoDB collections and indexes ready");
        Ok(())
    }

    /// `create` the collection with its validator, or `collMod` it when it already exists.
    async fn apply_collection_spec(&self, spec: &CollectionSpec) -> Result<(), AppError> {
        let validator = to_document(&spec.validator)?;
        let create = doc! {
            "create": spec.name,
            "validator": validator.clone(),
            "validationLevel": "strict",
            "validationAction": "error",
        };

        match self.db.run_command(create).await {
            Ok(_) => tracing::info!(collection = spec.name, "Created collection"),
            Err(e) if command_code(&e) == Some(NAMESPACE_EXISTS) => {
                self.db
                    .run_command(doc! {
                        "collMod": spec.name,
                        "validator": validator,
                        "validationLevel": "strict",
                        "validationAction": "error",
                    })
                    .await
                    .map_err(db_err)?;
                tracing::debug!(collection = spec.name, "Updated collection validator");
            }
            Err(e) => return Err(db_err(e)),
        }

        let models = spec
            .indexes
            .iter()
            .map(index_model)
            .collect::<Result<Vec<_>, _>>()?;
        create_indexes(&self.db.collection::<Document>(spec.name), models).await
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(collections::USERS)
    }

    fn refresh_tokens(&self) -> Collection<RefreshTokenDoc> {
        self.db.collection(collections::REFRESH_TOKENS)
    }

    fn accounts(&self) -> Collection<LinkedAccount> {
        self.db.collection(collections::ACCOUNTS)
    }

    fn campaigns(&self) -> Collection<Campaign> {
        self.db.collection(collections::CAMPAIGNS)
    }

    fn meta_metrics(&self) -> Collection<MetaAdMetricDoc> {
        self.db.collection(collections::META_AD_METRICS)
    }

    fn spotify_metrics(&self) -> Collection<SpotifyMetricDoc> {
        self.db.collection(collections::SPOTIFY_METRICS)
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Insert a new user; fails with `Conflict` if the email is taken.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut stored = user.clone();
        stored.email = user.email.to_lowercase();
        match self.users().insert_one(&stored).await {
            Ok(_) => {
                tracing::debug!(collection = collections::USERS, user_id = %user.id, "Inserted user");
                Ok(())
            }
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(format!(
                "{} already registered",
                user.email
            ))),
            Err(e) => Err(db_err(e)),
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.users()
            .find_one(doc! { "id": user_id })
            .await
            .map_err(db_err)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.users()
            .find_one(doc! { "email": email.to_lowercase() })
            .await
            .map_err(db_err)
    }

    /// Replace a stored user. Email changes are not supported.
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let result = self
            .users()
            .replace_one(doc! { "id": user.id.as_str() }, user)
            .await
            .map_err(db_err)?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User {}", user.id)));
        }
        Ok(())
    }

    // ─── Refresh Token Operations ────────────────────────────────

    pub async fn insert_refresh_token(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        self.refresh_tokens()
            .insert_one(RefreshTokenDoc::from(record))
            .await
            .map_err(db_err)?;
        tracing::debug!(collection = collections::REFRESH_TOKENS, user_id = %record.user_id, "Stored refresh token");
        Ok(())
    }

    pub async fn get_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let stored = self
            .refresh_tokens()
            .find_one(doc! { "tokenHash": token_hash })
            .await
            .map_err(db_err)?;
        stored.map(RefreshTokenRecord::try_from).transpose()
    }

    /// Mark a token revoked. Returns the record as it was before, if it was active.
    ///
    /// The active check and the revoke are one `findOneAndUpdate`, so two
    /// concurrent refreshes with the same token cannot both succeed.
    pub async fn revoke_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        replaced_by: Option<String>,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let now = to_bson_time(now);
        let before = self
            .refresh_tokens()
            .find_one_and_update(
                doc! {
                    "tokenHash": token_hash,
                    "revokedAt": null,
                    "expiresAt": { "$gt": now },
                },
                doc! { "$set": { "revokedAt": now, "replacedBy": replaced_by } },
            )
            .return_document(ReturnDocument::Before)
            .await
            .map_err(db_err)?;
        before.map(RefreshTokenRecord::try_from).transpose()
    }

    /// Drop tokens that expired before `now`. The TTL index does the same lazily.
    pub async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize, AppError> {
        let result = self
            .refresh_tokens()
            .delete_many(doc! { "expiresAt": { "$lte": to_bson_time(now) } })
            .await
            .map_err(db_err)?;
        Ok(usize::try_from(result.deleted_count).unwrap_or(usize::MAX))
    }

    // ─── Account Operations ──────────────────────────────────────

    pub async fn insert_account(&self, account: &LinkedAccount) -> Result<(), AppError> {
        self.accounts().insert_one(account).await.map_err(db_err)?;
        tracing::debug!(collection = collections::ACCOUNTS, account_id = %account.id, "Inserted account");
        Ok(())
    }

    pub async fn list_accounts(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Vec<LinkedAccount>, AppError> {
        let mut accounts: Vec<LinkedAccount> = self
            .accounts()
            .find(doc! { "userId": user_id, "platform": platform.as_str() })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)?;
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(accounts)
    }

    /// Mark an account disconnected and forget its tokens.
    pub async fn disconnect_account(
        &self,
        user_id: &str,
        platform: Platform,
        account_id: &str,
    ) -> Result<(), AppError> {
        let result = self
            .accounts()
            .update_one(
                doc! { "id": account_id, "userId": user_id, "platform": platform.as_str() },
                doc! { "$set": { "connected": false, "accessToken": "", "refreshToken": null } },
            )
            .await
            .map_err(db_err)?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Account {}", account_id)));
        }
        Ok(())
    }

    // ─── Campaign Operations ─────────────────────────────────────

    pub async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        self.campaigns().insert_one(campaign).await.map_err(db_err)?;
        tracing::debug!(collection = collections::CAMPAIGNS, campaign_id = %campaign.id, "Inserted campaign");
        Ok(())
    }

    /// Get a campaign owned by `user_id`. Other users' campaigns look absent.
    pub async fn get_campaign(
        &self,
        user_id: &str,
        campaign_id: &str,
    ) -> Result<Option<Campaign>, AppError> {
        self.campaigns()
            .find_one(doc! { "id": campaign_id, "userId": user_id })
            .await
            .map_err(db_err)
    }

    pub async fn list_campaigns(&self, user_id: &str) -> Result<Vec<Campaign>, AppError> {
        let mut campaigns: Vec<Campaign> = self
            .campaigns()
            .find(doc! { "userId": user_id })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)?;
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }

    pub async fn update_campaign(&self, campaign: &Campaign) -> Result<(), AppError> {
        let result = self
            .campaigns()
            .replace_one(
                doc! { "id": campaign.id.as_str(), "userId": campaign.user_id.as_str() },
                campaign,
            )
            .await
            .map_err(db_err)?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("Campaign {}", campaign.id)));
        }
        Ok(())
    }

    // ─── Metric Operations ───────────────────────────────────────

    /// Append a Meta snapshot; `(campaignId, date, adId)` must be new.
    pub async fn insert_meta_metric(&self, metric: &MetaAdMetric) -> Result<(), AppError> {
        let stored = MetaAdMetricDoc::try_from(metric)?;
        match self.meta_metrics().insert_one(stored).await {
            Ok(_) => {
                tracing::debug!(collection = collections::META_AD_METRICS, campaign_id = %metric.campaign_id, "Inserted snapshot");
                Ok(())
            }
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(format!(
                "{} snapshot for campaign {} on {} ({}) already recorded",
                collections::META_AD_METRICS,
                metric.campaign_id,
                metric.date,
                metric.ad_id
            ))),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Append a Spotify snapshot; `(campaignId, date, trackId)` must be new.
    pub async fn insert_spotify_metric(&self, metric: &SpotifyMetric) -> Result<(), AppError> {
        let stored = SpotifyMetricDoc::try_from(metric)?;
        match self.spotify_metrics().insert_one(stored).await {
            Ok(_) => {
                tracing::debug!(collection = collections::SPOTIFY_METRICS, campaign_id = %metric.campaign_id, "Inserted snapshot");
                Ok(())
            }
            Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict(format!(
                "{} snapshot for campaign {} on {} ({}) already recorded",
                collections::SPOTIFY_METRICS,
                metric.campaign_id,
                metric.date,
                metric.track_id
            ))),
            Err(e) => Err(db_err(e)),
        }
    }

    /// Meta snapshots for a campaign, newest day first.
    pub async fn query_meta_metrics(
        &self,
        query: &MetricsQuery,
    ) -> Result<Vec<MetaAdMetric>, AppError> {
        let stored: Vec<MetaAdMetricDoc> = self
            .meta_metrics()
            .find(metrics_filter(query))
            .sort(doc! { "date": -1, "adId": 1 })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)?;
        stored.into_iter().map(MetaAdMetric::try_from).collect()
    }

    /// Spotify snapshots for a campaign, newest day first.
    pub async fn query_spotify_metrics(
        &self,
        query: &MetricsQuery,
    ) -> Result<Vec<SpotifyMetric>, AppError> {
        let stored: Vec<SpotifyMetricDoc> = self
            .spotify_metrics()
            .find(metrics_filter(query))
            .sort(doc! { "date": -1, "trackId": 1 })
            .await
            .map_err(db_err)?
            .try_collect()
            .await
            .map_err(db_err)?;
        stored.into_iter().map(SpotifyMetric::try_from).collect()
    }
}

// ─── Stored Documents ────────────────────────────────────────────

/// `refreshTokens` document. Times are BSON dates so the TTL index applies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenDoc {
    token_hash: String,
    user_id: String,
    created_at: BsonDateTime,
    expires_at: BsonDateTime,
    revoked_at: Option<BsonDateTime>,
    replaced_by: Option<String>,
}

impl From<&RefreshTokenRecord> for RefreshTokenDoc {
    fn from(record: &RefreshTokenRecord) -> Self {
        Self {
            token_hash: record.token_hash.clone(),
            user_id: record.user_id.clone(),
            created_at: to_bson_time(record.created_at),
            expires_at: to_bson_time(record.expires_at),
            revoked_at: record.revoked_at.map(to_bson_time),
            replaced_by: record.replaced_by.clone(),
        }
    }
}

impl TryFrom<RefreshTokenDoc> for RefreshTokenRecord {
    type Error = AppError;

    fn try_from(doc: RefreshTokenDoc) -> Result<Self, AppError> {
        Ok(Self {
            token_hash: doc.token_hash,
            user_id: doc.user_id,
            created_at: from_bson_time(doc.created_at)?,
            expires_at: from_bson_time(doc.expires_at)?,
            revoked_at: doc.revoked_at.map(from_bson_time).transpose()?,
            replaced_by: doc.replaced_by,
        })
    }
}

/// `metaAdMetrics` document in the shape its validator expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaAdMetricDoc {
    campaign_id: String,
    ad_id: String,
    date: BsonDateTime,
    impressions: i64,
    clicks: i64,
    spend: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reach: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conversions: Option<i64>,
}

impl TryFrom<&MetaAdMetric> for MetaAdMetricDoc {
    type Error = AppError;

    fn try_from(m: &MetaAdMetric) -> Result<Self, AppError> {
        Ok(Self {
            campaign_id: m.campaign_id.clone(),
            ad_id: m.ad_id.clone(),
            date: day_to_bson(m.date),
            impressions: to_long("impressions", m.impressions)?,
            clicks: to_long("clicks", m.clicks)?,
            spend: m.spend,
            reach: m.reach.map(|v| to_long("reach", v)).transpose()?,
            conversions: m.conversions.map(|v| to_long("conversions", v)).transpose()?,
        })
    }
}

impl TryFrom<MetaAdMetricDoc> for MetaAdMetric {
    type Error = AppError;

    fn try_from(doc: MetaAdMetricDoc) -> Result<Self, AppError> {
        Ok(Self {
            campaign_id: doc.campaign_id,
            ad_id: doc.ad_id,
            date: bson_to_day(doc.date)?,
            impressions: from_long(doc.impressions),
            clicks: from_long(doc.clicks),
            spend: doc.spend,
            reach: doc.reach.map(from_long),
            conversions: doc.conversions.map(from_long),
        })
    }
}

/// `spotifyMetrics` document in the shape its validator expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpotifyMetricDoc {
    campaign_id: String,
    track_id: String,
    date: BsonDateTime,
    streams: i64,
    listeners: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saves: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    playlist_adds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    followers: Option<i64>,
}

impl TryFrom<&SpotifyMetric> for SpotifyMetricDoc {
    type Error = AppError;

    fn try_from(m: &SpotifyMetric) -> Result<Self, AppError> {
        Ok(Self {
            campaign_id: m.campaign_id.clone(),
            track_id: m.track_id.clone(),
            date: day_to_bson(m.date),
            streams: to_long("streams", m.streams)?,
            listeners: to_long("listeners", m.listeners)?,
            saves: m.saves.map(|v| to_long("saves", v)).transpose()?,
            playlist_adds: m.playlist_adds.map(|v| to_long("playlistAdds", v)).transpose()?,
            followers: m.followers.map(|v| to_long("followers", v)).transpose()?,
        })
    }
}

impl TryFrom<SpotifyMetricDoc> for SpotifyMetric {
    type Error = AppError;

    fn try_from(doc: SpotifyMetricDoc) -> Result<Self, AppError> {
        Ok(Self {
            campaign_id: doc.campaign_id,
            track_id: doc.track_id,
            date: bson_to_day(doc.date)?,
            streams: from_long(doc.streams),
            listeners: from_long(doc.listeners),
            saves: doc.saves.map(from_long),
            playlist_adds: doc.playlist_adds.map(from_long),
            followers: doc.followers.map(from_long),
        })
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

fn metrics_filter(query: &MetricsQuery) -> Document {
    let mut filter = doc! { "campaignId": query.campaign_id.as_str() };
    let mut date = Document::new();
    if let Some(from) = query.from {
        date.insert("$gte", day_to_bson(from));
    }
    if let Some(to) = query.to {
        date.insert("$lte", day_to_bson(to));
    }
    if !date.is_empty() {
        filter.insert("date", date);
    }
    filter
}

fn to_bson_time(time: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(time.timestamp_millis())
}

fn from_bson_time(time: BsonDateTime) -> Result<DateTime<Utc>, AppError> {
    DateTime::<Utc>::from_timestamp_millis(time.timestamp_millis())
        .ok_or_else(|| AppError::Database(format!("timestamp out of range: {}", time)))
}

/// Snapshot days are stored as midnight UTC.
fn day_to_bson(day: NaiveDate) -> BsonDateTime {
    to_bson_time(day.and_time(NaiveTime::MIN).and_utc())
}

fn bson_to_day(time: BsonDateTime) -> Result<NaiveDate, AppError> {
    Ok(from_bson_time(time)?.date_naive())
}

fn to_long(field: &str, value: u64) -> Result<i64, AppError> {
    i64::try_from(value)
        .map_err(|_| AppError::Validation(format!("{}: exceeds the 64-bit signed range", field)))
}

/// The validators reject negative counters.
fn from_long(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn to_document(value: &serde_json::Value) -> Result<Document, AppError> {
    bson::to_document(value).map_err(|e| AppError::Database(format!("bad schema document: {}", e)))
}

fn index_model(spec: &IndexSpec) -> Result<IndexModel, AppError> {
    let keys = to_document(&spec.keys)?;
    Ok(if spec.unique {
        unique_index(keys, &spec.name)
    } else {
        index(keys, &spec.name)
    })
}

fn index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().name(name.to_string()).build())
        .build()
}

fn unique_index(keys: Document, name: &str) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build(),
        )
        .build()
}

async fn create_indexes<T: Send + Sync>(
    collection: &Collection<T>,
    models: Vec<IndexModel>,
) -> Result<(), AppError> {
    collection.create_indexes(models).await.map_err(db_err)?;
    tracing::debug!(collection = collection.name(), "Indexes ensured");
    Ok(())
}

fn db_err(e: mongodb::error::Error) -> AppError {
    AppError::Database(e.to_string())
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(w)) if w.code == DUPLICATE_KEY
    )
}

fn command_code(e: &mongodb::error::Error) -> Option<i32> {
    match e.kind.as_ref() {
        ErrorKind::Command(c) => Some(c.code),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> MetaAdMetric {
        MetaAdMetric {
            campaign_id: "c1".to_string(),
            ad_id: "ad-1".to_string(),
            date: "2026-04-01".parse().unwrap(),
            impressions: 1200,
            clicks: 34,
            spend: 12.5,
            reach: None,
            conversions: Some(3),
        }
    }

    #[test]
    fn test_snapshot_day_stored_as_midnight_utc() {
        let day: NaiveDate = "2026-04-01".parse().unwrap();
        let stored = day_to_bson(day);
        assert_eq!(stored.timestamp_millis(), 1_775_001_600_000);
        assert_eq!(bson_to_day(stored).unwrap(), day);
    }

    #[test]
    fn test_meta_document_matches_validator_shape() {
        let stored = MetaAdMetricDoc::try_from(&meta()).unwrap();
        let doc = bson::to_document(&stored).unwrap();

        assert!(matches!(doc.get("date"), Some(bson::Bson::DateTime(_))));
        assert!(matches!(doc.get("impressions"), Some(bson::Bson::Int64(1200))));
        // Absent optionals are left out rather than stored as null.
        assert!(!doc.contains_key("reach"));
        assert_eq!(MetaAdMetric::try_from(stored).unwrap(), meta());
    }

    #[test]
    fn test_counter_outside_long_range_rejected() {
        let mut metric = meta();
        metric.impressions = u64::MAX;
        assert!(matches!(
            MetaAdMetricDoc::try_from(&metric),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_metrics_filter_date_bounds() {
        let filter = metrics_filter(&MetricsQuery {
            campaign_id: "c1".to_string(),
            from: "2026-04-02".parse().ok(),
            to: None,
        });
        let date = filter.get_document("date").unwrap();
        assert!(date.contains_key("$gte"));
        assert!(!date.contains_key("$lte"));

        let open = metrics_filter(&MetricsQuery {
            campaign_id: "c1".to_string(),
            from: None,
            to: None,
        });
        assert!(!open.contains_key("date"));
    }

    #[test]
    fn test_refresh_token_round_trip_keeps_revocation() {
        let now = DateTime::<Utc>::from_timestamp_millis(1_775_001_600_123).unwrap();
        let record = RefreshTokenRecord {
            token_hash: "h1".to_string(),
            user_id: "u1".to_string(),
            created_at: now,
            expires_at: now + chrono::Duration::days(7),
            revoked_at: Some(now),
            replaced_by: Some("h2".to_string()),
        };

        let back = RefreshTokenRecord::try_from(RefreshTokenDoc::from(&record)).unwrap();
        assert_eq!(back.expires_at, record.expires_at);
        assert_eq!(back.revoked_at, Some(now));
        assert_eq!(back.replaced_by.as_deref(), Some("h2"));
    }
}
