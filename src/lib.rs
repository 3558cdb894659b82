// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SongTrackPro: campaign analytics for music promotion
//!
//! This crate provides the API gateway and the auth, meta, spotify and
//! analytics services that aggregate Meta Ads and Spotify-for-Artists
//! metrics per campaign.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use middleware::RateLimits;
use services::{MetricsClient, ProxyService, RouteTable, SessionService};
use std::net::SocketAddr;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub limits: RateLimits,
    pub routes: RouteTable,
    pub proxy: ProxyService,
    pub sessions: SessionService,
    pub metrics_client: MetricsClient,
}

impl AppState {
    /// Build state for the process role named in `config` on top of `db`.
    pub fn new(config: Config, db: Database) -> anyhow::Result<Self> {
        let routes = RouteTable::from_upstreams(&config.upstreams)?;
        let proxy = ProxyService::new(config.proxy_timeout)?;
        let metrics_client = MetricsClient::new(
            &config.upstreams.meta,
            &config.upstreams.spotify,
            config.proxy_timeout,
        )?;

        Ok(Self {
            limits: RateLimits::new(config.trust_proxy),
            sessions: SessionService::new(db.clone(), config.clone()),
            config,
            db,
            routes,
            proxy,
            metrics_client,
        })
    }
}

/// Serve the router for `state` on `listener` until the future is dropped or `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let app = routes::create_router(state);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
