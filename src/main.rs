// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SongTrackPro backend
//!
//! One binary runs the API gateway or any of the domain services; the
//! subcommand picks the role.

use clap::{Parser, Subcommand};
use songtrackpro::{
    config::{Config, ServiceKind},
    db::Database,
    schema, AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired rate-limit windows and refresh tokens are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "songtrackpro")]
#[command(version, about = "SongTrackPro API gateway and domain services")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the public API gateway
    Gateway,
    /// Run the auth service
    Auth,
    /// Run the Meta Ads service
    Meta,
    /// Run the Spotify for Artists service
    Spotify,
    /// Run the analytics service
    Analytics,
    /// Print the metric collection validators and indexes as JSON
    Schema,
}

impl Command {
    fn service(&self) -> Option<ServiceKind> {
        match self {
            Command::Gateway => Some(ServiceKind::Gateway),
            Command::Auth => Some(ServiceKind::Auth),
            Command::Meta => Some(ServiceKind::Meta),
            Command::Spotify => Some(ServiceKind::Spotify),
            Command::Analytics => Some(ServiceKind::Analytics),
            Command::Schema => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let Some(service) = args.command.service() else {
        println!(
            "{}",
            serde_json::to_string_pretty(&schema::init_document())?
        );
        return Ok(());
    };

    // Initialize structured JSON logging
    init_logging();

    let config = Config::from_env(service)?;
    tracing::info!(service = %service, port = config.port, "Starting SongTrackPro");

    let db = if service.needs_database() {
        Database::connect(&config.mongodb_uri, &config.mongodb_database).await?
    } else {
        Database::disconnected()
    };

    let state = Arc::new(AppState::new(config, db)?);
    if service == ServiceKind::Gateway {
        tracing::info!(prefixes = ?state.routes.prefixes(), "Upstream routes loaded");
    }

    tokio::spawn(purge_expired(state.clone()));

    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    songtrackpro::serve(listener, state, shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drop state that can no longer affect a decision.
async fn purge_expired(state: Arc<AppState>) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
        interval.tick().await;
        let windows = state.limits.purge_expired();
        let tokens = match state.db.purge_expired_tokens(chrono::Utc::now()).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to purge expired refresh tokens");
                0
            }
        };
        if windows > 0 || tokens > 0 {
            tracing::debug!(windows, tokens, "Purged expired entries");
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["songtrackpro=debug", "info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry().with(filter).with(format).init();
}
