//! CreditVault Backend Library
//!
//! Core of the CreditVault DeFi platform backend: exactly-once settlement of
//! inbound ledger events, credit scoring, and the loan lifecycle.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod loan;
pub mod loan_service;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod settlement;
pub mod state;
pub mod webhook;

use axum::{routing::get, Json, Router};
use sqlx::PgPool;

use state::AppState;

/// Assemble the API router over the shared application state
pub fn build_router(app_state: AppState) -> Router {
    let health_pool = app_state.db_pool.clone();

    Router::new()
        .route("/", get(root))
        .route("/health", get(move || health_check(health_pool.clone())))
        .merge(routes::webhook_routes())
        .merge(routes::loan_routes())
        .merge(routes::credit_routes())
        .with_state(app_state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
}

async fn root() -> &'static str {
    "CreditVault API Server"
}

/// Health check response
#[derive(serde::Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(pool: PgPool) -> Json<HealthResponse> {
    let db_status = match db::check_health(&pool).await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if db_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        database: db_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
