//! CreditVault Backend Server
//!
//! Serves the settlement, credit scoring, and loan lifecycle APIs over the
//! PostgreSQL ledger store.

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};

use creditvault_server::cache::{Cache, MemoryCache, NoopCache};
use creditvault_server::config::Config;
use creditvault_server::db;
use creditvault_server::loan_service::LoanService;
use creditvault_server::scoring::ScoringEngine;
use creditvault_server::state::AppState;
use creditvault_server::webhook::WebhookService;
use creditvault_server::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(environment = config.environment.as_str(), "Starting CreditVault server");

    if config.webhook_secret.is_none() {
        tracing::warn!("WEBHOOK_SECRET is not set; inbound event deliveries will be rejected");
    }

    let db_pool = db::create_pool(&config)
        .await
        .context("Failed to create database pool")?;
    db::run_migrations(&db_pool)
        .await
        .context("Failed to run migrations")?;

    // The cache is a pluggable capability; the no-op variant keeps every
    // read correct, just uncached.
    let cache: Arc<dyn Cache> = if config.cache_enabled {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(NoopCache)
    };
    let cache_ttl = Duration::from_secs(config.cache_ttl_seconds);

    let scoring_engine = Arc::new(ScoringEngine::new(
        db_pool.clone(),
        cache.clone(),
        cache_ttl,
    ));
    let loan_service = Arc::new(LoanService::new(db_pool.clone(), cache.clone()));
    let webhook_service = Arc::new(WebhookService::new(
        db_pool.clone(),
        config.webhook_secret.clone(),
        cache.clone(),
    ));

    let app_state = AppState::new(db_pool, loan_service, scoring_engine, webhook_service);

    let app = build_router(app_state).layer(configure_cors(&config));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check at http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

fn configure_cors(config: &Config) -> CorsLayer {
    let allowed_origins = config.cors_allowed_origins.clone().unwrap_or_default();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
