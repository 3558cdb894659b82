// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request forwarding to upstream services.
//!
//! Bodies are buffered in both directions. There is no retry and no
//! fallback: a failed upstream call surfaces as 502 to the caller.

use crate::error::AppError;
use crate::services::routing::RouteMatch;
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};
use std::time::Duration;

/// Largest request body the gateway will buffer.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Connection-level headers that must not be relayed (RFC 9110 §7.6.1).
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &HeaderName, connection_listed: &[String]) -> bool {
    let name = name.as_str();
    HOP_BY_HOP.contains(&name) || connection_listed.iter().any(|c| c == name)
}

/// Header names listed in `Connection`, which are hop-by-hop for this message.
fn connection_tokens(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Copy end-to-end headers, dropping hop-by-hop ones and any length framing.
fn copy_end_to_end(source: &HeaderMap) -> HeaderMap {
    let listed = connection_tokens(source);
    let mut out = HeaderMap::with_capacity(source.len());
    for (name, value) in source {
        if is_hop_by_hop(name, &listed) || name == header::CONTENT_LENGTH {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// HTTP forwarder shared by all gateway routes.
#[derive(Clone)]
pub struct ProxyService {
    http: reqwest::Client,
}

impl ProxyService {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { http })
    }

    /// Forward `request` to the matched upstream and relay its response.
    pub async fn forward(
        &self,
        target: &RouteMatch<'_>,
        request: Request,
        client_ip: &str,
        trust_proxy: bool,
    ) -> Result<Response, AppError> {
        let route = target.route;
        let (parts, body) = request.into_parts();

        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| AppError::PayloadTooLarge)?;

        let url = route.upstream_url(&target.forward_path, parts.uri.query());

        let mut headers = copy_end_to_end(&parts.headers);
        let original_host = headers.remove(header::HOST);
        let authority = route.authority();
        headers.insert(
            header::HOST,
            HeaderValue::from_str(&authority)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("bad upstream host: {}", e)))?,
        );
        set_forwarded(&mut headers, client_ip, trust_proxy, original_host);

        tracing::debug!(
            service = %route.service,
            method = %parts.method,
            upstream = %url,
            "Forwarding request"
        );

        let upstream_response = self
            .http
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| AppError::Upstream {
                service: route.service.clone(),
                reason: e.to_string(),
            })?;

        let status = upstream_response.status();
        let mut response_headers = copy_end_to_end(upstream_response.headers());
        strip_cors(&mut response_headers);
        let bytes = upstream_response
            .bytes()
            .await
            .map_err(|e| AppError::Upstream {
                service: route.service.clone(),
                reason: e.to_string(),
            })?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// CORS is decided by the gateway; drop what the upstream said so headers are not doubled.
fn strip_cors(headers: &mut HeaderMap) {
    let names: Vec<HeaderName> = headers
        .keys()
        .filter(|name| name.as_str().starts_with("access-control-"))
        .cloned()
        .collect();
    for name in names {
        headers.remove(name);
    }
}

/// `X-Forwarded-For` to send upstream. Its last entry is always `client_ip`.
///
/// A chain from an untrusted peer is discarded. A trusted chain is kept and
/// `client_ip` appended unless it is already the last hop.
fn forwarded_for(existing: Option<&str>, client_ip: &str, trust_proxy: bool) -> String {
    let chain = existing
        .filter(|_| trust_proxy)
        .map(str::trim)
        .filter(|chain| !chain.is_empty());
    match chain {
        Some(chain) if chain.rsplit(',').next().map(str::trim) == Some(client_ip) => {
            chain.to_string()
        }
        Some(chain) => format!("{}, {}", chain, client_ip),
        None => client_ip.to_string(),
    }
}

/// Set `X-Forwarded-For` and record the original host and scheme.
fn set_forwarded(
    headers: &mut HeaderMap,
    client_ip: &str,
    trust_proxy: bool,
    original_host: Option<HeaderValue>,
) {
    let existing = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());
    let forwarded_for = forwarded_for(existing, client_ip, trust_proxy);
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert("x-forwarded-for", value);
    }
    if let Some(host) = original_host {
        headers.insert("x-forwarded-host", host);
    }
    if !headers.contains_key("x-forwarded-proto") {
        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
    }
}
