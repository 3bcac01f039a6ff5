//! Event ingestion service
//!
//! One entry point, [`WebhookService::ingest`], owns the whole inbound path:
//! verify the signature, narrow the envelope, and record + settle the event
//! inside a single transaction. The event row insert and the settlement it
//! triggers can never diverge: a handler failure rolls the row back too, so
//! the delivery stays retryable.

use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::ApiError;
use crate::settlement;

use super::{signature, InboundEvent, WebhookEnvelope};

/// Outcome of an ingest call. Replayed deliveries come back with
/// `duplicate: true` and the id recorded for the first delivery.
#[derive(Debug, Serialize, Clone)]
pub struct IngestReceipt {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub duplicate: bool,
}

/// Inbound webhook ingestion service
#[derive(Clone)]
pub struct WebhookService {
    db_pool: PgPool,
    secret: Option<String>,
    cache: Arc<dyn Cache>,
}

impl WebhookService {
    /// Create a new ingestion service instance
    pub fn new(db_pool: PgPool, secret: Option<String>, cache: Arc<dyn Cache>) -> Self {
        Self {
            db_pool,
            secret,
            cache,
        }
    }

    /// Ingest one signed delivery.
    ///
    /// Fail-closed on authentication: a missing or wrong signature, or an
    /// unconfigured secret, rejects the delivery before anything is parsed
    /// or persisted.
    pub async fn ingest(
        &self,
        body: &[u8],
        provided_signature: Option<&str>,
    ) -> Result<IngestReceipt, ApiError> {
        let secret = match self.secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::error!("Webhook secret not configured, rejecting delivery");
                return Err(ApiError::Unauthorized(
                    "Webhook endpoint is not configured".to_string(),
                ));
            }
        };
        let provided_signature = provided_signature.ok_or_else(|| {
            ApiError::Unauthorized("Missing webhook signature header".to_string())
        })?;
        signature::verify(secret, body, provided_signature)?;

        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::ValidationError(format!("Malformed envelope: {}", e)))?;
        let envelope: WebhookEnvelope = serde_json::from_value(payload.clone())
            .map_err(|e| ApiError::ValidationError(format!("Malformed envelope: {}", e)))?;
        let event = InboundEvent::try_from(envelope)?;

        let event_type = event.event_type();
        let correlation_key = event.correlation_key();

        let mut tx = self.db_pool.begin().await?;

        // The unique index on (correlation_key, event_type) is the guard: a
        // concurrent or repeated delivery lands on the conflict arm no
        // matter how the race interleaves.
        let inserted: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events (id, event_type, correlation_key, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (correlation_key, event_type) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event_type)
        .bind(&correlation_key)
        .bind(&payload)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(event_id) = inserted else {
            tx.rollback().await?;
            let existing_id: Uuid = sqlx::query_scalar(
                "SELECT id FROM webhook_events WHERE correlation_key = $1 AND event_type = $2",
            )
            .bind(&correlation_key)
            .bind(event_type)
            .fetch_one(&self.db_pool)
            .await?;

            tracing::info!(
                event_type,
                correlation_key,
                event_id = %existing_id,
                "Duplicate delivery, returning recorded outcome"
            );
            return Ok(IngestReceipt {
                event_id: existing_id,
                event_type,
                duplicate: true,
            });
        };

        let affected_user = self.dispatch(&mut tx, &event).await?;

        sqlx::query(
            "UPDATE webhook_events SET processed = TRUE, processed_at = NOW() WHERE id = $1",
        )
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some(user_id) = affected_user {
            self.cache
                .invalidate(&crate::scoring::profile_cache_key(user_id))
                .await;
        }

        tracing::info!(event_type, correlation_key, %event_id, "Processed inbound event");

        Ok(IngestReceipt {
            event_id,
            event_type,
            duplicate: false,
        })
    }

    /// Route a validated event to its handler. Returns the user whose
    /// credit profile the settlement touched, for cache invalidation after
    /// commit.
    async fn dispatch(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        event: &InboundEvent,
    ) -> Result<Option<Uuid>, ApiError> {
        match event {
            InboundEvent::TransactionConfirmed { transaction_hash } => {
                let outcome = settlement::apply_transaction_confirmation(tx, transaction_hash).await?;
                Ok(outcome.affected_user())
            }
            InboundEvent::PaymentCompleted {
                payment_id,
                user_id,
                amount,
                currency,
            } => {
                let outcome =
                    settlement::apply_payment_completed(tx, payment_id, *user_id, *amount, currency)
                        .await?;
                Ok(outcome.affected_user())
            }
            InboundEvent::PaymentFailed { payment_id } => {
                tracing::warn!(payment_id, "Payment failed upstream, no ledger credit");
                Ok(None)
            }
            InboundEvent::RefundProcessed { payment_id } => {
                tracing::info!(payment_id, "Refund processed upstream, no ledger credit");
                Ok(None)
            }
            InboundEvent::ContractEvent {
                contract_address, ..
            } => {
                tracing::debug!(contract_address, "Recorded contract event metadata");
                Ok(None)
            }
            InboundEvent::BlockMined { block_number } => {
                tracing::debug!(block_number, "Recorded mined block metadata");
                Ok(None)
            }
        }
    }
}
