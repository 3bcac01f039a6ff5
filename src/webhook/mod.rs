//! Inbound event ingestion for CreditVault
//!
//! External notifiers (chain watchers, payment processors) deliver signed
//! JSON envelopes. This module verifies them, narrows them into a closed
//! event enum, and records them exactly once.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

pub mod service;
pub mod signature;

pub use service::{IngestReceipt, WebhookService};

/// Raw inbound envelope as delivered on the wire. Which optional fields must
/// be present depends on the event type; [`InboundEvent::try_from`] enforces
/// that per variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEnvelope {
    pub event_type: String,
    pub transaction_hash: Option<String>,
    pub block_number: Option<i64>,
    pub contract_address: Option<String>,
    pub payment_id: Option<String>,
    /// Positive decimal rendered as a string by the notifier
    pub amount: Option<String>,
    /// Three-letter uppercase currency code
    pub currency: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Validated inbound event, one variant per supported type
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum InboundEvent {
    TransactionConfirmed {
        transaction_hash: String,
    },
    PaymentCompleted {
        payment_id: String,
        user_id: Uuid,
        amount: Decimal,
        currency: String,
    },
    PaymentFailed {
        payment_id: String,
    },
    RefundProcessed {
        payment_id: String,
    },
    ContractEvent {
        contract_address: String,
        transaction_hash: Option<String>,
    },
    BlockMined {
        block_number: i64,
    },
}

impl InboundEvent {
    /// Wire name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            InboundEvent::TransactionConfirmed { .. } => "transaction_confirmed",
            InboundEvent::PaymentCompleted { .. } => "payment_completed",
            InboundEvent::PaymentFailed { .. } => "payment_failed",
            InboundEvent::RefundProcessed { .. } => "refund_processed",
            InboundEvent::ContractEvent { .. } => "contract_event",
            InboundEvent::BlockMined { .. } => "block_mined",
        }
    }

    /// External identifier this event deduplicates on. Together with the
    /// event type it forms the unique key in the event log.
    pub fn correlation_key(&self) -> String {
        match self {
            InboundEvent::TransactionConfirmed { transaction_hash } => transaction_hash.clone(),
            InboundEvent::PaymentCompleted { payment_id, .. } => payment_id.clone(),
            InboundEvent::PaymentFailed { payment_id } => payment_id.clone(),
            InboundEvent::RefundProcessed { payment_id } => payment_id.clone(),
            InboundEvent::ContractEvent {
                contract_address,
                transaction_hash,
            } => match transaction_hash {
                Some(hash) => format!("{}:{}", contract_address, hash),
                None => contract_address.clone(),
            },
            InboundEvent::BlockMined { block_number } => block_number.to_string(),
        }
    }
}

impl TryFrom<WebhookEnvelope> for InboundEvent {
    type Error = ApiError;

    fn try_from(envelope: WebhookEnvelope) -> Result<Self, Self::Error> {
        match envelope.event_type.as_str() {
            "transaction_confirmed" => {
                let hash = require(envelope.transaction_hash, "transactionHash")?;
                validate_tx_hash(&hash)?;
                Ok(InboundEvent::TransactionConfirmed {
                    transaction_hash: hash,
                })
            }
            "payment_completed" => {
                let payment_id = require(envelope.payment_id, "paymentId")?;
                let user_id = require(envelope.user_id, "userId")?;
                let amount = parse_amount(&require(envelope.amount, "amount")?)?;
                let currency = require(envelope.currency, "currency")?;
                validate_currency(&currency)?;
                Ok(InboundEvent::PaymentCompleted {
                    payment_id,
                    user_id,
                    amount,
                    currency,
                })
            }
            "payment_failed" => Ok(InboundEvent::PaymentFailed {
                payment_id: require(envelope.payment_id, "paymentId")?,
            }),
            "refund_processed" => Ok(InboundEvent::RefundProcessed {
                payment_id: require(envelope.payment_id, "paymentId")?,
            }),
            "contract_event" => {
                let contract_address = require(envelope.contract_address, "contractAddress")?;
                validate_contract_address(&contract_address)?;
                if let Some(hash) = &envelope.transaction_hash {
                    validate_tx_hash(hash)?;
                }
                Ok(InboundEvent::ContractEvent {
                    contract_address,
                    transaction_hash: envelope.transaction_hash,
                })
            }
            "block_mined" => {
                let block_number = require(envelope.block_number, "blockNumber")?;
                if block_number < 0 {
                    return Err(ApiError::ValidationError(
                        "blockNumber must not be negative".to_string(),
                    ));
                }
                Ok(InboundEvent::BlockMined { block_number })
            }
            other => Err(ApiError::ValidationError(format!(
                "Unsupported event type: '{}'",
                other
            ))),
        }
    }
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::ValidationError(format!("Missing required field: {}", field)))
}

/// Transaction hashes are `0x` followed by 64 hex characters
fn validate_tx_hash(hash: &str) -> Result<(), ApiError> {
    let hex_part = hash
        .strip_prefix("0x")
        .filter(|h| h.len() == 64 && h.chars().all(|c| c.is_ascii_hexdigit()));
    if hex_part.is_none() {
        return Err(ApiError::ValidationError(format!(
            "Invalid transaction hash: '{}'",
            hash
        )));
    }
    Ok(())
}

/// Contract addresses are `0x` followed by 40 hex characters
fn validate_contract_address(address: &str) -> Result<(), ApiError> {
    let hex_part = address
        .strip_prefix("0x")
        .filter(|a| a.len() == 40 && a.chars().all(|c| c.is_ascii_hexdigit()));
    if hex_part.is_none() {
        return Err(ApiError::ValidationError(format!(
            "Invalid contract address: '{}'",
            address
        )));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<(), ApiError> {
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::ValidationError(format!(
            "Invalid currency code: '{}'",
            currency
        )));
    }
    Ok(())
}

fn parse_amount(raw: &str) -> Result<Decimal, ApiError> {
    let amount: Decimal = raw
        .parse()
        .map_err(|_| ApiError::ValidationError(format!("Invalid amount: '{}'", raw)))?;
    if amount <= Decimal::ZERO {
        return Err(ApiError::ValidationError(format!(
            "Amount must be positive, got '{}'",
            raw
        )));
    }
    Ok(amount)
}
