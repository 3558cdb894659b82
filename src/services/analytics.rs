// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-platform campaign analytics.
//!
//! Handles:
//! - Fetching metric snapshots from the meta and spotify services
//! - Aggregating them into a [`CampaignSummary`]

use crate::error::AppError;
use crate::models::metrics::{DateRange, MetaTotals, SpotifyTotals};
use crate::models::{Campaign, CampaignSummary, MetaAdMetric, SpotifyMetric};
use axum::http::HeaderValue;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::time::Duration;

/// Client for the metric endpoints of the meta and spotify services.
#[derive(Clone)]
pub struct MetricsClient {
    http: reqwest::Client,
    meta_url: String,
    spotify_url: String,
}

impl MetricsClient {
    pub fn new(meta_url: &str, spotify_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            meta_url: meta_url.trim_end_matches('/').to_string(),
            spotify_url: spotify_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn meta_metrics(
        &self,
        authorization: &HeaderValue,
        campaign_id: &str,
        range: &DateRange,
    ) -> Result<Vec<MetaAdMetric>, AppError> {
        let url = format!("{}/metrics", self.meta_url);
        self.get_metrics("meta", &url, authorization, campaign_id, range)
            .await
    }

    pub async fn spotify_metrics(
        &self,
        authorization: &HeaderValue,
        campaign_id: &str,
        range: &DateRange,
    ) -> Result<Vec<SpotifyMetric>, AppError> {
        let url = format!("{}/metrics", self.spotify_url);
        self.get_metrics("spotify", &url, authorization, campaign_id, range)
            .await
    }

    async fn get_metrics<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        authorization: &HeaderValue,
        campaign_id: &str,
        range: &DateRange,
    ) -> Result<Vec<T>, AppError> {
        let upstream_err = |reason: String| AppError::Upstream {
            service: service.to_string(),
            reason,
        };

        let mut query = vec![("campaignId", campaign_id.to_string())];
        if let Some(from) = range.from {
            query.push(("from", from.to_string()));
        }
        if let Some(to) = range.to {
            query.push(("to", to.to_string()));
        }

        let response = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, authorization.clone())
            .query(&query)
            .send()
            .await
            .map_err(|e| upstream_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_err(format!("{} returned {}: {}", url, status, body)));
        }

        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| upstream_err(format!("bad metrics payload: {}", e)))
    }
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator > 0.0).then(|| numerator / denominator)
}

/// Aggregate snapshots belonging to `campaign`.
///
/// Meta snapshots only count when they belong to the campaign's ad (if one is
/// set); likewise Spotify snapshots and the campaign's track.
pub fn summarize(
    campaign: &Campaign,
    meta: &[MetaAdMetric],
    spotify: &[SpotifyMetric],
) -> CampaignSummary {
    let meta: Vec<&MetaAdMetric> = meta
        .iter()
        .filter(|m| m.campaign_id == campaign.id)
        .filter(|m| campaign.ad_id.as_ref().is_none_or(|ad| *ad == m.ad_id))
        .collect();
    let spotify: Vec<&SpotifyMetric> = spotify
        .iter()
        .filter(|m| m.campaign_id == campaign.id)
        .filter(|m| {
            campaign
                .spotify_track_id
                .as_ref()
                .is_none_or(|track| *track == m.track_id)
        })
        .collect();

    // Counters saturate instead of wrapping; snapshots come from other services.
    let mut meta_totals = MetaTotals::default();
    for m in &meta {
        meta_totals.impressions = meta_totals.impressions.saturating_add(m.impressions);
        meta_totals.clicks = meta_totals.clicks.saturating_add(m.clicks);
        meta_totals.spend += m.spend;
        meta_totals.conversions = meta_totals
            .conversions
            .saturating_add(m.conversions.unwrap_or(0));
    }
    meta_totals.ctr = ratio(
        meta_totals.clicks as f64 * 100.0,
        meta_totals.impressions as f64,
    );
    meta_totals.cpc = ratio(meta_totals.spend, meta_totals.clicks as f64);

    let mut spotify_totals = SpotifyTotals::default();
    for m in &spotify {
        spotify_totals.streams = spotify_totals.streams.saturating_add(m.streams);
        spotify_totals.peak_listeners = spotify_totals.peak_listeners.max(m.listeners);
        spotify_totals.saves = spotify_totals.saves.saturating_add(m.saves.unwrap_or(0));
        spotify_totals.playlist_adds = spotify_totals
            .playlist_adds
            .saturating_add(m.playlist_adds.unwrap_or(0));
    }

    let days: HashSet<NaiveDate> = meta
        .iter()
        .map(|m| m.date)
        .chain(spotify.iter().map(|m| m.date))
        .collect();

    CampaignSummary {
        campaign_id: campaign.id.clone(),
        days: days.len() as u32,
        cost_per_stream: ratio(meta_totals.spend, spotify_totals.streams as f64),
        budget_used: ratio(meta_totals.spend, campaign.budget),
        meta: meta_totals,
        spotify: spotify_totals,
    }
}
