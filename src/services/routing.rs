// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Static routing table: path prefix → upstream service.

use crate::config::{ConfigError, UpstreamUrls};
use reqwest::Url;

/// One prefix mapping.
#[derive(Debug, Clone)]
pub struct Route {
    /// Segment-aligned path prefix, e.g. `/auth`
    pub prefix: String,
    /// Name used in logs and upstream errors
    pub service: String,
    pub upstream: Url,
}

impl Route {
    /// `host[:port]` of the upstream, as sent in the `Host` header.
    pub fn authority(&self) -> String {
        let host = self.upstream.host_str().unwrap_or_default();
        match self.upstream.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Absolute upstream URL for a forwarded path and raw query.
    pub fn upstream_url(&self, forward_path: &str, query: Option<&str>) -> String {
        let base = self.upstream.as_str().trim_end_matches('/');
        match query {
            Some(q) if !q.is_empty() => format!("{}{}?{}", base, forward_path, q),
            _ => format!("{}{}", base, forward_path),
        }
    }
}

/// Result of resolving a request path.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Original path with the prefix removed (never empty)
    pub forward_path: String,
}

/// Prefix routes ordered longest first.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gateway table for the four domain services.
    pub fn from_upstreams(upstreams: &UpstreamUrls) -> Result<Self, ConfigError> {
        Self::new()
            .with_route("/auth", "auth", &upstreams.auth)?
            .with_route("/meta", "meta", &upstreams.meta)?
            .with_route("/spotify", "spotify", &upstreams.spotify)?
            .with_route("/analytics", "analytics", &upstreams.analytics)
    }

    pub fn with_route(
        mut self,
        prefix: &str,
        service: &str,
        upstream: &str,
    ) -> Result<Self, ConfigError> {
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            return Err(ConfigError::Route(format!(
                "prefix {:?} must start with '/' and not end with one",
                prefix
            )));
        }
        if self.routes.iter().any(|r| r.prefix == prefix) {
            return Err(ConfigError::Route(format!("duplicate prefix {:?}", prefix)));
        }

        let url = Url::parse(upstream)
            .map_err(|e| ConfigError::Route(format!("{}: {}", upstream, e)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::Route(format!(
                "{} is not an http(s) URL",
                upstream
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigError::Route(format!(
                "{} must not carry a query or fragment",
                upstream
            )));
        }

        self.routes.push(Route {
            prefix: prefix.to_string(),
            service: service.to_string(),
            upstream: url,
        });
        self.routes
            .sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));
        Ok(self)
    }

    /// Longest segment-aligned prefix match for `path`.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().find_map(|route| {
            let rest = path.strip_prefix(route.prefix.as_str())?;
            if rest.is_empty() {
                Some(RouteMatch {
                    route,
                    forward_path: "/".to_string(),
                })
            } else if rest.starts_with('/') {
                Some(RouteMatch {
                    route,
                    forward_path: rest.to_string(),
                })
            } else {
                None
            }
        })
    }

    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.routes.iter().map(|r| r.prefix.as_str()).collect();
        prefixes.sort_unstable();
        prefixes
    }
}
