// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify service routes: artist account links and `spotifyMetrics` snapshots.

use crate::db::Database;
use crate::error::Result;
use crate::models::metrics::MetricsQuery;
use crate::models::{Platform, SpotifyMetric};
use crate::routes::platform::{self, AccountLink, PlatformMetric};
use crate::schema::validate_spotify_metric;
use crate::AppState;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    platform::routes::<SpotifyMetric>()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LinkArtistRequest {
    #[validate(length(min = 1, max = 64))]
    artist_id: String,
    #[validate(length(min = 1))]
    access_token: String,
    refresh_token: Option<String>,
}

impl From<LinkArtistRequest> for AccountLink {
    fn from(req: LinkArtistRequest) -> Self {
        Self {
            external_id: req.artist_id,
            access_token: req.access_token,
            refresh_token: req.refresh_token,
        }
    }
}

impl PlatformMetric for SpotifyMetric {
    const PLATFORM: Platform = Platform::Spotify;
    type LinkRequest = LinkArtistRequest;

    fn from_document(doc: serde_json::Value) -> Result<Self> {
        validate_spotify_metric(doc)
    }

    fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn insert(db: &Database, metric: &Self) -> impl Future<Output = Result<()>> + Send {
        db.insert_spotify_metric(metric)
    }

    fn query(
        db: &Database,
        query: &MetricsQuery,
    ) -> impl Future<Output = Result<Vec<Self>>> + Send {
        db.query_spotify_metrics(query)
    }
}
