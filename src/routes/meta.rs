// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meta service routes: ad account links and `metaAdMetrics` snapshots.

use crate::db::Database;
use crate::error::Result;
use crate::models::metrics::MetricsQuery;
use crate::models::{MetaAdMetric, Platform};
use crate::routes::platform::{self, AccountLink, PlatformMetric};
use crate::schema::validate_meta_ad_metric;
use crate::AppState;
use axum::Router;
use chrono::NaiveDate;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    platform::routes::<MetaAdMetric>()
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LinkAdAccountRequest {
    #[validate(length(min = 1, max = 64))]
    ad_account_id: String,
    #[validate(length(min = 1))]
    access_token: String,
    refresh_token: Option<String>,
}

impl From<LinkAdAccountRequest> for AccountLink {
    fn from(req: LinkAdAccountRequest) -> Self {
        Self {
            external_id: req.ad_account_id,
            access_token: req.access_token,
            refresh_token: req.refresh_token,
        }
    }
}

impl PlatformMetric for MetaAdMetric {
    const PLATFORM: Platform = Platform::Meta;
    type LinkRequest = LinkAdAccountRequest;

    fn from_document(doc: serde_json::Value) -> Result<Self> {
        validate_meta_ad_metric(doc)
    }

    fn campaign_id(&self) -> &str {
        &self.campaign_id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn insert(db: &Database, metric: &Self) -> impl Future<Output = Result<()>> + Send {
        db.insert_meta_metric(metric)
    }

    fn query(
        db: &Database,
        query: &MetricsQuery,
    ) -> impl Future<Output = Result<Vec<Self>>> + Send {
        db.query_meta_metrics(query)
    }
}
