// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process configuration loaded from environment variables.
//!
//! Every backend process (gateway and domain services) reads the same set of
//! variables; which ones are required depends on the [`ServiceKind`] being
//! started.

use std::env;
use std::fmt;
use std::time::Duration;

/// Which backend process this binary is running as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Gateway,
    Auth,
    Meta,
    Spotify,
    Analytics,
}

impl ServiceKind {
    /// Service name reported by `/health`.
    pub fn name(self) -> &'static str {
        match self {
            ServiceKind::Gateway => "gateway",
            ServiceKind::Auth => "auth-service",
            ServiceKind::Meta => "meta-service",
            ServiceKind::Spotify => "spotify-service",
            ServiceKind::Analytics => "analytics-service",
        }
    }

    /// Port used when `PORT` is unset.
    pub fn default_port(self) -> u16 {
        match self {
            ServiceKind::Gateway => 3000,
            ServiceKind::Auth => 3001,
            ServiceKind::Meta => 3002,
            ServiceKind::Spotify => 3003,
            ServiceKind::Analytics => 3004,
        }
    }

    /// Whether the process verifies access tokens and therefore needs a signing key.
    pub fn needs_signing_key(self) -> bool {
        !matches!(self, ServiceKind::Gateway)
    }

    /// Whether the process keeps data in MongoDB.
    pub fn needs_database(self) -> bool {
        !matches!(self, ServiceKind::Gateway)
    }

    /// `TRUST_PROXY` default. Domain services are only reached through the gateway.
    pub fn trusts_proxy_by_default(self) -> bool {
        !matches!(self, ServiceKind::Gateway)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Base URLs of the domain services, as seen from the gateway.
#[derive(Debug, Clone)]
pub struct UpstreamUrls {
    pub auth: String,
    pub meta: String,
    pub spotify: String,
    pub analytics: String,
}

impl Default for UpstreamUrls {
    fn default() -> Self {
        Self {
            auth: "http://localhost:3001".to_string(),
            meta: "http://localhost:3002".to_string(),
            spotify: "http://localhost:3003".to_string(),
            analytics: "http://localhost:3004".to_string(),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Process role
    pub service: ServiceKind,
    /// Listen port
    pub port: u16,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// HS256 key for access tokens (empty for the gateway)
    pub jwt_signing_key: Vec<u8>,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,
    /// Domain service base URLs
    pub upstreams: UpstreamUrls,
    /// Upper bound on a single upstream call
    pub proxy_timeout: Duration,
    /// Take the client address from the last `X-Forwarded-For` entry
    pub trust_proxy: bool,
    /// MongoDB connection string
    pub mongodb_uri: String,
    /// MongoDB database name
    pub mongodb_database: String,
}

impl Config {
    /// Config for tests: auth service role, fixed key, default upstreams.
    pub fn test_default() -> Self {
        Self {
            service: ServiceKind::Auth,
            port: 0,
            frontend_url: "http://localhost:5173".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            upstreams: UpstreamUrls::default(),
            proxy_timeout: Duration::from_secs(30),
            trust_proxy: ServiceKind::Auth.trusts_proxy_by_default(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "songtrackpro_test".to_string(),
        }
    }

    /// Same as [`Config::test_default`] with a different role.
    pub fn test_for(service: ServiceKind) -> Self {
        Self {
            service,
            trust_proxy: service.trusts_proxy_by_default(),
            ..Self::test_default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env(service: ServiceKind) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = UpstreamUrls::default();

        let jwt_signing_key = match env::var("JWT_SIGNING_KEY") {
            Ok(key) => key.trim().as_bytes().to_vec(),
            Err(_) if !service.needs_signing_key() => Vec::new(),
            Err(_) => return Err(ConfigError::Missing("JWT_SIGNING_KEY")),
        };

        Ok(Self {
            service,
            port: parse_var("PORT", service.default_port())?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            jwt_signing_key,
            access_token_ttl: Duration::from_secs(parse_var("ACCESS_TOKEN_TTL_SECS", 15 * 60)?),
            refresh_token_ttl: Duration::from_secs(parse_var(
                "REFRESH_TOKEN_TTL_SECS",
                7 * 24 * 60 * 60,
            )?),
            upstreams: UpstreamUrls {
                auth: env::var("AUTH_SERVICE_URL").unwrap_or(defaults.auth),
                meta: env::var("META_SERVICE_URL").unwrap_or(defaults.meta),
                spotify: env::var("SPOTIFY_SERVICE_URL").unwrap_or(defaults.spotify),
                analytics: env::var("ANALYTICS_SERVICE_URL").unwrap_or(defaults.analytics),
            },
            proxy_timeout: Duration::from_secs(parse_var("PROXY_TIMEOUT_SECS", 30)?),
            trust_proxy: parse_var("TRUST_PROXY", service.trusts_proxy_by_default())?,
            mongodb_uri: env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "songtrackpro".to_string()),
        })
    }
}

/// Read and parse an optional variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid upstream route: {0}")]
    Route(String),
}
