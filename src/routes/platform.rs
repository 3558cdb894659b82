// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Routes shared by the meta and spotify services.
//!
//! Both expose the same surface over different snapshot types:
//! - `GET/POST /accounts`, `DELETE /accounts/{id}` for linked accounts
//! - `GET/POST /metrics` for daily metric snapshots
//!
//! Authentication and rate limiting are applied in routes/mod.rs.

use crate::db::Database;
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::metrics::MetricsQuery;
use crate::models::{AccountView, LinkedAccount, Platform};
use crate::routes::extract::{JsonBody, QueryParams, ValidatedJson};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use validator::Validate;

/// Credentials supplied when linking an account.
pub struct AccountLink {
    pub external_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// A platform's snapshot type and how it is checked and stored.
pub trait PlatformMetric: Serialize + Send + Sync + Sized + 'static {
    const PLATFORM: Platform;

    /// Body of `POST /accounts`.
    type LinkRequest: DeserializeOwned + Validate + Into<AccountLink> + Send + 'static;

    /// Schema check for an incoming snapshot document.
    fn from_document(doc: serde_json::Value) -> Result<Self>;

    fn campaign_id(&self) -> &str;

    fn date(&self) -> NaiveDate;

    fn insert(db: &Database, metric: &Self) -> impl Future<Output = Result<()>> + Send;

    fn query(db: &Database, query: &MetricsQuery)
        -> impl Future<Output = Result<Vec<Self>>> + Send;
}

pub fn routes<M: PlatformMetric>() -> Router<Arc<AppState>> {
    Router::new()
        .route("/accounts", get(list_accounts::<M>).post(link_account::<M>))
        .route("/accounts/{id}", delete(disconnect_account::<M>))
        .route("/metrics", get(list_metrics::<M>).post(record_metric::<M>))
}

// ─── Accounts ────────────────────────────────────────────────

async fn link_account<M: PlatformMetric>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<M::LinkRequest>,
) -> Result<(StatusCode, Json<AccountView>)> {
    let link: AccountLink = req.into();
    let account = LinkedAccount {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        platform: M::PLATFORM,
        external_id: link.external_id,
        access_token: link.access_token,
        refresh_token: link.refresh_token,
        connected: true,
        last_sync_at: None,
        created_at: Utc::now(),
    };
    state.db.insert_account(&account).await?;

    tracing::info!(
        user_id = %user.user_id,
        platform = M::PLATFORM.as_str(),
        account_id = %account.id,
        "Account linked"
    );
    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

async fn list_accounts<M: PlatformMetric>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<AccountView>>> {
    let accounts = state.db.list_accounts(&user.user_id, M::PLATFORM).await?;
    Ok(Json(accounts.iter().map(AccountView::from).collect()))
}

async fn disconnect_account<M: PlatformMetric>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .db
        .disconnect_account(&user.user_id, M::PLATFORM, &id)
        .await?;
    tracing::info!(user_id = %user.user_id, account_id = %id, "Account disconnected");
    Ok(StatusCode::NO_CONTENT)
}

// ─── Metrics ─────────────────────────────────────────────────

/// Append one snapshot after schema validation.
async fn record_metric<M: PlatformMetric>(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    JsonBody(doc): JsonBody<serde_json::Value>,
) -> Result<(StatusCode, Json<M>)> {
    let metric = M::from_document(doc)?;
    M::insert(&state.db, &metric).await?;

    tracing::debug!(
        user_id = %user.user_id,
        platform = M::PLATFORM.as_str(),
        campaign_id = %metric.campaign_id(),
        date = %metric.date(),
        "Recorded snapshot"
    );
    Ok((StatusCode::CREATED, Json(metric)))
}

async fn list_metrics<M: PlatformMetric>(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<MetricsQuery>,
) -> Result<Json<Vec<M>>> {
    Ok(Json(M::query(&state.db, &query).await?))
}
