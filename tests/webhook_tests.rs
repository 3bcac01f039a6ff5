//! Inbound envelope validation and correlation key tests

use rust_decimal_macros::dec;
use uuid::Uuid;

use creditvault_server::error::ApiError;
use creditvault_server::webhook::{InboundEvent, WebhookEnvelope};

const TX_HASH: &str = "0x4f2a9b3c8d1e5f60718293a4b5c6d7e8f901234567890abcdef0123456789abc";
const CONTRACT: &str = "0x52908400098527886e0f7030069857d2e4169ee7";

fn envelope(event_type: &str) -> WebhookEnvelope {
    serde_json::from_value(serde_json::json!({ "eventType": event_type }))
        .expect("minimal envelope deserializes")
}

fn assert_validation_error(result: Result<InboundEvent, ApiError>) {
    assert!(matches!(result, Err(ApiError::ValidationError(_))));
}

// ============================================================================
// Envelope Narrowing
// ============================================================================

#[test]
fn test_transaction_confirmed_requires_valid_hash() {
    let mut env = envelope("transaction_confirmed");
    env.transaction_hash = Some(TX_HASH.to_string());

    let event = InboundEvent::try_from(env).expect("valid event");
    assert_eq!(
        event,
        InboundEvent::TransactionConfirmed {
            transaction_hash: TX_HASH.to_string(),
        }
    );
}

#[test]
fn test_transaction_confirmed_rejects_missing_or_malformed_hash() {
    assert_validation_error(InboundEvent::try_from(envelope("transaction_confirmed")));

    let mut short = envelope("transaction_confirmed");
    short.transaction_hash = Some("0x1234".to_string());
    assert_validation_error(InboundEvent::try_from(short));

    let mut unprefixed = envelope("transaction_confirmed");
    unprefixed.transaction_hash = Some(TX_HASH.trim_start_matches("0x").to_string());
    assert_validation_error(InboundEvent::try_from(unprefixed));

    let mut non_hex = envelope("transaction_confirmed");
    non_hex.transaction_hash = Some(format!("0x{}", "g".repeat(64)));
    assert_validation_error(InboundEvent::try_from(non_hex));
}

#[test]
fn test_payment_completed_requires_all_fields() {
    let user_id = Uuid::new_v4();
    let mut env = envelope("payment_completed");
    env.payment_id = Some("pay_123".to_string());
    env.user_id = Some(user_id);
    env.amount = Some("125.50".to_string());
    env.currency = Some("USD".to_string());

    let event = InboundEvent::try_from(env).expect("valid event");
    assert_eq!(
        event,
        InboundEvent::PaymentCompleted {
            payment_id: "pay_123".to_string(),
            user_id,
            amount: dec!(125.50),
            currency: "USD".to_string(),
        }
    );
}

#[test]
fn test_payment_completed_rejects_bad_amounts() {
    for bad_amount in ["-5", "0", "not-a-number", ""] {
        let mut env = envelope("payment_completed");
        env.payment_id = Some("pay_123".to_string());
        env.user_id = Some(Uuid::new_v4());
        env.amount = Some(bad_amount.to_string());
        env.currency = Some("USD".to_string());
        assert_validation_error(InboundEvent::try_from(env));
    }
}

#[test]
fn test_payment_completed_rejects_bad_currency() {
    for bad_currency in ["usd", "US", "DOLLARS", "U$D"] {
        let mut env = envelope("payment_completed");
        env.payment_id = Some("pay_123".to_string());
        env.user_id = Some(Uuid::new_v4());
        env.amount = Some("10".to_string());
        env.currency = Some(bad_currency.to_string());
        assert_validation_error(InboundEvent::try_from(env));
    }
}

#[test]
fn test_contract_event_validates_address() {
    let mut env = envelope("contract_event");
    env.contract_address = Some(CONTRACT.to_string());
    let event = InboundEvent::try_from(env).expect("valid event");
    assert!(matches!(event, InboundEvent::ContractEvent { .. }));

    let mut bad = envelope("contract_event");
    bad.contract_address = Some("0xdeadbeef".to_string());
    assert_validation_error(InboundEvent::try_from(bad));
}

#[test]
fn test_block_mined_rejects_negative_numbers() {
    let mut env = envelope("block_mined");
    env.block_number = Some(-1);
    assert_validation_error(InboundEvent::try_from(env));

    let mut env = envelope("block_mined");
    env.block_number = Some(0);
    assert_eq!(
        InboundEvent::try_from(env).expect("valid event"),
        InboundEvent::BlockMined { block_number: 0 }
    );
}

#[test]
fn test_unknown_event_type_rejected() {
    assert_validation_error(InboundEvent::try_from(envelope("account_suspended")));
}

// ============================================================================
// Correlation Keys
// ============================================================================

#[test]
fn test_correlation_keys_per_variant() {
    let confirmed = InboundEvent::TransactionConfirmed {
        transaction_hash: TX_HASH.to_string(),
    };
    assert_eq!(confirmed.correlation_key(), TX_HASH);
    assert_eq!(confirmed.event_type(), "transaction_confirmed");

    let payment = InboundEvent::PaymentCompleted {
        payment_id: "pay_42".to_string(),
        user_id: Uuid::new_v4(),
        amount: dec!(10),
        currency: "USD".to_string(),
    };
    assert_eq!(payment.correlation_key(), "pay_42");

    let failed = InboundEvent::PaymentFailed {
        payment_id: "pay_42".to_string(),
    };
    assert_eq!(failed.correlation_key(), "pay_42");
    // Same key, different event type: the (key, type) pair stays unique
    assert_ne!(failed.event_type(), payment.event_type());

    let block = InboundEvent::BlockMined { block_number: 1234 };
    assert_eq!(block.correlation_key(), "1234");

    let contract = InboundEvent::ContractEvent {
        contract_address: CONTRACT.to_string(),
        transaction_hash: Some(TX_HASH.to_string()),
    };
    assert_eq!(
        contract.correlation_key(),
        format!("{}:{}", CONTRACT, TX_HASH)
    );
}

// ============================================================================
// Envelope Deserialization
// ============================================================================

#[test]
fn test_envelope_uses_camel_case_fields() {
    let raw = serde_json::json!({
        "eventType": "payment_completed",
        "paymentId": "pay_9",
        "userId": "7f6c2f32-4e02-4f17-8b2a-8f0a4f3f7c11",
        "amount": "42.00",
        "currency": "EUR"
    });
    let envelope: WebhookEnvelope = serde_json::from_value(raw).expect("deserializes");
    let event = InboundEvent::try_from(envelope).expect("valid event");
    assert!(matches!(event, InboundEvent::PaymentCompleted { .. }));
}
