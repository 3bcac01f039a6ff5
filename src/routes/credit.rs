//! Credit profile route definitions

use axum::{routing::get, Router};

use crate::handlers::{get_credit_profile, get_score_history};
use crate::state::AppState;

pub fn credit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/credit/:user_id", get(get_credit_profile))
        .route("/api/credit/:user_id/history", get(get_score_history))
}
