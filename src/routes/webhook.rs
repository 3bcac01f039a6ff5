//! Webhook route definitions

use axum::{routing::post, Router};

use crate::handlers::receive_event;
use crate::state::AppState;

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/api/webhooks/events", post(receive_event))
}
