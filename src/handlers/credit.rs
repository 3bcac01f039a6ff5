//! Credit profile handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::scoring::{CreditProfile, CreditScoreHistoryEntry, ScoringEngine};

/// GET /api/credit/:user_id - read-only credit report
pub async fn get_credit_profile(
    State(scoring_engine): State<Arc<ScoringEngine>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CreditProfile>>, ApiError> {
    let profile = scoring_engine.credit_profile(user_id).await?;

    Ok(Json(ApiResponse::ok(profile)))
}

/// Query for score history reads
#[derive(Debug, Deserialize)]
pub struct ScoreHistoryQuery {
    pub limit: Option<i64>,
}

/// GET /api/credit/:user_id/history - persisted score snapshots, newest first
pub async fn get_score_history(
    State(scoring_engine): State<Arc<ScoringEngine>>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ScoreHistoryQuery>,
) -> Result<Json<ApiResponse<Vec<CreditScoreHistoryEntry>>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let history = scoring_engine.score_history(user_id, limit).await?;

    Ok(Json(ApiResponse::ok(history)))
}
