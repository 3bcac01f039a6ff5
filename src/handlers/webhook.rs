//! Webhook ingestion handler

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::ApiResponse;
use crate::webhook::{IngestReceipt, WebhookService};

/// Header carrying the hex HMAC-SHA256 of the raw request body
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// POST /api/webhooks/events - ingest one signed delivery
///
/// The body is taken raw so the signature verifies the exact bytes received.
pub async fn receive_event(
    State(webhook_service): State<Arc<WebhookService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<IngestReceipt>>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let receipt = webhook_service.ingest(&body, signature).await?;

    Ok(Json(ApiResponse::ok(receipt)))
}
