//! Loan API handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::loan::{Loan, LoanRequest, RepayLoanRequest, RepaymentReceipt};
use crate::loan_service::LoanService;
use crate::models::ApiResponse;

/// Owner scope for loan reads
#[derive(Debug, Deserialize)]
pub struct LoanOwnerQuery {
    pub user_id: Uuid,
}

/// POST /api/loans - request a new loan
pub async fn create_loan(
    State(loan_service): State<Arc<LoanService>>,
    Json(request): Json<LoanRequest>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    request.validate()?;

    let loan = loan_service.request_loan(request).await?;

    Ok(Json(ApiResponse::ok(loan)))
}

/// POST /api/loans/:id/repay - repay an active loan in full
pub async fn repay_loan(
    State(loan_service): State<Arc<LoanService>>,
    Path(loan_id): Path<Uuid>,
    Json(request): Json<RepayLoanRequest>,
) -> Result<Json<ApiResponse<RepaymentReceipt>>, ApiError> {
    request.validate()?;

    let receipt = loan_service.repay_loan(loan_id, request).await?;

    Ok(Json(ApiResponse::ok(receipt)))
}

/// GET /api/loans/:id - fetch a loan scoped to its owner
pub async fn get_loan(
    State(loan_service): State<Arc<LoanService>>,
    Path(loan_id): Path<Uuid>,
    Query(query): Query<LoanOwnerQuery>,
) -> Result<Json<ApiResponse<Loan>>, ApiError> {
    let loan = loan_service.get_loan(loan_id, query.user_id).await?;

    Ok(Json(ApiResponse::ok(loan)))
}
