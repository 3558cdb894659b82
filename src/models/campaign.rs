// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Promotion campaign model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    /// `completed` is terminal; every other move is allowed.
    pub fn can_transition_to(self, next: CampaignStatus) -> bool {
        self != CampaignStatus::Completed || next == CampaignStatus::Completed
    }
}

/// Campaign linking an ad and/or a track to a budget and date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub ad_account_id: Option<String>,
    pub ad_id: Option<String>,
    pub spotify_track_id: Option<String>,
    pub budget: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateCampaignRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: String,
    pub ad_account_id: Option<String>,
    pub ad_id: Option<String>,
    pub spotify_track_id: Option<String>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub budget: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

fn validate_create_dates(req: &CreateCampaignRequest) -> Result<(), ValidationError> {
    check_date_range(req.start_date, req.end_date)
}

/// `end` must not precede `start`.
pub fn check_date_range(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), ValidationError> {
    match end {
        Some(end) if end < start => {
            let mut err = ValidationError::new("date_range");
            err.message = Some("endDate must not be before startDate".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignRequest {
    #[validate(length(min = 1, max = 200, message = "must be 1-200 characters"))]
    pub name: Option<String>,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub budget: Option<f64>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<CampaignStatus>,
}
