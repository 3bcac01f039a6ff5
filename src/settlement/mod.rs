//! Settlement dispatcher
//!
//! Applies confirmed external events as ledger mutations. Every function here
//! composes into the caller's transaction, so a settlement commits or rolls
//! back together with the webhook bookkeeping that triggered it. Duplicate
//! suppression lives entirely in the idempotency guard's key uniqueness;
//! nothing in this module compares amounts to decide whether to credit.
//!
//! Note that confirmations and completed payments deduplicate under different
//! correlation keys (transaction hash vs payment id). A transfer reported on
//! both paths credits twice; reconciling the two keys needs an upstream rule
//! this core does not define.

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Transaction as LedgerTransaction, TransactionStatus, TransactionType};
use crate::scoring::{self, ScoreAction};

/// What a settlement call did to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// A deposit was confirmed and the owner's savings balance credited
    DepositCredited { user_id: Uuid },

    /// A non-deposit transaction was marked completed, no balance mutation
    MarkedCompleted { transaction_id: Uuid },

    /// The hash matched no pending transaction; nothing changed
    UnknownTransaction,
}

impl SettlementOutcome {
    /// The user whose credit profile this settlement touched, if any
    pub fn affected_user(&self) -> Option<Uuid> {
        match self {
            SettlementOutcome::DepositCredited { user_id } => Some(*user_id),
            _ => None,
        }
    }
}

/// Settle an on-chain confirmation for a previously submitted transaction.
///
/// A hash that matches no pending transaction is a foreign confirmation and
/// a deliberate no-op. Deposits credit the owner's savings balance and apply
/// a `savings_deposit` score delta keyed by the hash; other transaction
/// types are completed elsewhere and only have their status advanced here.
pub async fn apply_transaction_confirmation(
    tx: &mut Transaction<'_, Postgres>,
    tx_hash: &str,
) -> Result<SettlementOutcome, ApiError> {
    let pending: Option<LedgerTransaction> = sqlx::query_as(
        "SELECT * FROM transactions WHERE tx_hash = $1 AND status = $2 FOR UPDATE",
    )
    .bind(tx_hash)
    .bind(TransactionStatus::Pending)
    .fetch_optional(&mut **tx)
    .await?;

    let Some(pending) = pending else {
        tracing::debug!(tx_hash, "Confirmation matches no pending transaction, ignoring");
        return Ok(SettlementOutcome::UnknownTransaction);
    };

    sqlx::query("UPDATE transactions SET status = $1, completed_at = NOW() WHERE id = $2")
        .bind(TransactionStatus::Completed)
        .bind(pending.id)
        .execute(&mut **tx)
        .await?;

    if pending.transaction_type != TransactionType::Deposit {
        tracing::info!(
            tx_hash,
            transaction_id = %pending.id,
            transaction_type = ?pending.transaction_type,
            "Marked non-deposit transaction completed"
        );
        return Ok(SettlementOutcome::MarkedCompleted {
            transaction_id: pending.id,
        });
    }

    credit_savings(tx, pending.user_id, &pending.currency, pending.amount).await?;
    scoring::apply_score_change(
        tx,
        pending.user_id,
        ScoreAction::SavingsDeposit,
        Some(tx_hash),
    )
    .await?;

    tracing::info!(
        tx_hash,
        user_id = %pending.user_id,
        amount = %pending.amount,
        "Credited confirmed deposit to savings balance"
    );

    Ok(SettlementOutcome::DepositCredited {
        user_id: pending.user_id,
    })
}

/// Settle a completed external payment by recording a fresh deposit
/// transaction and crediting the user's savings balance, with a `payment`
/// score delta keyed by the payment id.
pub async fn apply_payment_completed(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: &str,
    user_id: Uuid,
    amount: Decimal,
    currency: &str,
) -> Result<SettlementOutcome, ApiError> {
    let known_user: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;
    if known_user.is_none() {
        return Err(ApiError::NotFound(format!("User {} not found", user_id)));
    }

    sqlx::query(
        r#"
        INSERT INTO transactions (id, user_id, transaction_type, amount, currency, status, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(TransactionType::Deposit)
    .bind(amount)
    .bind(currency)
    .bind(TransactionStatus::Completed)
    .execute(&mut **tx)
    .await?;

    credit_savings(tx, user_id, currency, amount).await?;
    scoring::apply_score_change(tx, user_id, ScoreAction::Payment, Some(payment_id)).await?;

    tracing::info!(
        payment_id,
        %user_id,
        %amount,
        currency,
        "Credited completed payment to savings balance"
    );

    Ok(SettlementOutcome::DepositCredited { user_id })
}

/// Additively credit (or create) a user's savings balance
async fn credit_savings(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    currency: &str,
    amount: Decimal,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO savings_balances (id, user_id, currency, balance)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, currency)
        DO UPDATE SET balance = savings_balances.balance + EXCLUDED.balance, updated_at = NOW()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(currency)
    .bind(amount)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
