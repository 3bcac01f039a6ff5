//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::loan_service::LoanService;
use crate::scoring::ScoringEngine;
use crate::webhook::WebhookService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub loan_service: Arc<LoanService>,
    pub scoring_engine: Arc<ScoringEngine>,
    pub webhook_service: Arc<WebhookService>,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        loan_service: Arc<LoanService>,
        scoring_engine: Arc<ScoringEngine>,
        webhook_service: Arc<WebhookService>,
    ) -> Self {
        Self {
            db_pool,
            loan_service,
            scoring_engine,
            webhook_service,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for Arc<LoanService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.loan_service.clone()
    }
}

impl FromRef<AppState> for Arc<ScoringEngine> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.scoring_engine.clone()
    }
}

impl FromRef<AppState> for Arc<WebhookService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.webhook_service.clone()
    }
}
