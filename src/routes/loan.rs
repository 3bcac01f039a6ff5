//! Loan route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{create_loan, get_loan, repay_loan};
use crate::state::AppState;

pub fn loan_routes() -> Router<AppState> {
    Router::new()
        .route("/api/loans", post(create_loan))
        .route("/api/loans/:id", get(get_loan))
        .route("/api/loans/:id/repay", post(repay_loan))
}
