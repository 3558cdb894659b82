// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! External platform link records (Meta ad accounts, Spotify artist accounts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform a linked account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Meta,
    Spotify,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Meta => "meta",
            Platform::Spotify => "spotify",
        }
    }
}

/// A user's link to an ad account or artist account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccount {
    pub id: String,
    pub user_id: String,
    pub platform: Platform,
    /// Meta ad account id or Spotify artist id
    pub external_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub connected: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Account as returned by the API. Tokens are never echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: String,
    pub platform: Platform,
    pub external_id: String,
    pub connected: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&LinkedAccount> for AccountView {
    fn from(account: &LinkedAccount) -> Self {
        Self {
            id: account.id.clone(),
            platform: account.platform,
            external_id: account.external_id.clone(),
            connected: account.connected,
            last_sync_at: account.last_sync_at,
            created_at: account.created_at,
        }
    }
}
