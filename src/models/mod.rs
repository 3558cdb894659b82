// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod account;
pub mod campaign;
pub mod metrics;
pub mod token;
pub mod user;

pub use account::{AccountView, LinkedAccount, Platform};
pub use campaign::{Campaign, CampaignStatus};
pub use metrics::{CampaignSummary, MetaAdMetric, SpotifyMetric};
pub use token::{RefreshTokenRecord, TokenPair};
pub use user::{Tier, User, UserProfile};
