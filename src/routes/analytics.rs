// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Analytics service routes: campaigns and cross-platform summaries.
//! Authentication and rate limiting are applied in routes/mod.rs.

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_TOKEN_COOKIE};
use crate::models::campaign::{check_date_range, CreateCampaignRequest, UpdateCampaignRequest};
use crate::models::metrics::DateRange;
use crate::models::{Campaign, CampaignStatus, CampaignSummary};
use crate::routes::extract::{QueryParams, ValidatedJson};
use crate::services::analytics::summarize;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/campaigns", get(list_campaigns).post(create_campaign))
        .route("/campaigns/{id}", get(get_campaign).patch(update_campaign))
        .route("/campaigns/{id}/summary", get(campaign_summary))
}

// ─── Campaigns ───────────────────────────────────────────────

async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ValidatedJson(req): ValidatedJson<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>)> {
    let now = Utc::now();
    let campaign = Campaign {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.user_id.clone(),
        name: req.name.trim().to_string(),
        ad_account_id: req.ad_account_id,
        ad_id: req.ad_id,
        spotify_track_id: req.spotify_track_id,
        budget: req.budget,
        start_date: req.start_date,
        end_date: req.end_date,
        status: CampaignStatus::Active,
        created_at: now,
        updated_at: now,
    };
    state.db.insert_campaign(&campaign).await?;

    tracing::info!(user_id = %user.user_id, campaign_id = %campaign.id, "Campaign created");
    Ok((StatusCode::CREATED, Json(campaign)))
}

async fn list_campaigns(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Campaign>>> {
    Ok(Json(state.db.list_campaigns(&user.user_id).await?))
}

async fn owned_campaign(state: &AppState, user: &AuthUser, id: &str) -> Result<Campaign> {
    state
        .db
        .get_campaign(&user.user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Campaign {}", id)))
}

async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>> {
    Ok(Json(owned_campaign(&state, &user, &id).await?))
}

async fn update_campaign(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCampaignRequest>,
) -> Result<Json<Campaign>> {
    let mut campaign = owned_campaign(&state, &user, &id).await?;

    if let Some(status) = req.status {
        if !campaign.status.can_transition_to(status) {
            return Err(AppError::BadRequest(
                "completed campaigns cannot be reopened".to_string(),
            ));
        }
        campaign.status = status;
    }
    if let Some(name) = req.name {
        campaign.name = name.trim().to_string();
    }
    if let Some(budget) = req.budget {
        campaign.budget = budget;
    }
    if let Some(end_date) = req.end_date {
        check_date_range(campaign.start_date, Some(end_date)).map_err(|_| {
            AppError::Validation("endDate: must not be before startDate".to_string())
        })?;
        campaign.end_date = Some(end_date);
    }

    campaign.updated_at = Utc::now();
    state.db.update_campaign(&campaign).await?;
    Ok(Json(campaign))
}

// ─── Summary ─────────────────────────────────────────────────

/// Credentials to present to the metric services on the caller's behalf.
fn caller_authorization(headers: &HeaderMap, jar: &CookieJar) -> Result<HeaderValue> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        return Ok(value.clone());
    }
    let cookie = jar.get(ACCESS_TOKEN_COOKIE).ok_or(AppError::Unauthorized)?;
    HeaderValue::from_str(&format!("Bearer {}", cookie.value())).map_err(|_| AppError::InvalidToken)
}

/// Totals across both platforms for one campaign.
async fn campaign_summary(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    QueryParams(range): QueryParams<DateRange>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<Json<CampaignSummary>> {
    let campaign = owned_campaign(&state, &user, &id).await?;
    let authorization = caller_authorization(&headers, &jar)?;

    let client = &state.metrics_client;
    let (meta, spotify) = tokio::try_join!(
        client.meta_metrics(&authorization, &campaign.id, &range),
        client.spotify_metrics(&authorization, &campaign.id, &range),
    )?;

    tracing::debug!(
        campaign_id = %campaign.id,
        meta_snapshots = meta.len(),
        spotify_snapshots = spotify.len(),
        "Summarizing campaign"
    );
    Ok(Json(summarize(&campaign, &meta, &spotify)))
}
