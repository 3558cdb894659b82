// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily metric snapshots and campaign summaries.
//!
//! Snapshots are append-only facts keyed by `(campaignId, date)` plus the
//! platform identifier (`adId` for Meta, `trackId` for Spotify).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Largest counter value a snapshot may carry (the BSON `long` range).
pub const MAX_COUNTER: u64 = i64::MAX as u64;

/// One day of Meta Ads counters for one ad (`metaAdMetrics` document).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MetaAdMetric {
    #[validate(length(min = 1, max = 128))]
    pub campaign_id: String,
    #[validate(length(min = 1, max = 128))]
    pub ad_id: String,
    pub date: NaiveDate,
    #[validate(range(max = MAX_COUNTER))]
    pub impressions: u64,
    #[validate(range(max = MAX_COUNTER))]
    pub clicks: u64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub spend: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = MAX_COUNTER))]
    pub reach: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = MAX_COUNTER))]
    pub conversions: Option<u64>,
}

/// One day of Spotify-for-Artists counters for one track (`spotifyMetrics` document).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SpotifyMetric {
    #[validate(length(min = 1, max = 128))]
    pub campaign_id: String,
    #[validate(length(min = 1, max = 128))]
    pub track_id: String,
    pub date: NaiveDate,
    #[validate(range(max = MAX_COUNTER))]
    pub streams: u64,
    #[validate(range(max = MAX_COUNTER))]
    pub listeners: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = MAX_COUNTER))]
    pub saves: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = MAX_COUNTER))]
    pub playlist_adds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(max = MAX_COUNTER))]
    pub followers: Option<u64>,
}

/// Query string for metric listings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub campaign_id: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl MetricsQuery {
    /// Inclusive date filter.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Query string for campaign summaries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Summed Meta counters with derived ratios.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MetaTotals {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub impressions: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub clicks: u64,
    pub spend: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub conversions: u64,
    /// clicks / impressions, as a percentage
    pub ctr: Option<f64>,
    /// spend / clicks
    pub cpc: Option<f64>,
}

/// Summed Spotify counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SpotifyTotals {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub streams: u64,
    /// Peak daily listeners in the range (listeners are not additive)
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub peak_listeners: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub saves: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub playlist_adds: u64,
}

/// Cross-platform view of one campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CampaignSummary {
    pub campaign_id: String,
    pub days: u32,
    pub meta: MetaTotals,
    pub spotify: SpotifyTotals,
    /// Ad spend / streams
    pub cost_per_stream: Option<f64>,
    /// Fraction of the campaign budget spent
    pub budget_used: Option<f64>,
}
