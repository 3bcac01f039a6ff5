//! Loan models for CreditVault
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Loan lifecycle status. Only `requested` creation and the
/// `active -> repaid` transition happen in this core; funding and default
/// detection arrive as external events.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Requested,
    Active,
    Repaid,
    Defaulted,
}

/// Loan model. The interest rate is a whole percent, fixed at creation.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Loan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub principal: Decimal,
    pub interest_rate: i32,
    pub duration_seconds: i64,
    pub collateral: Decimal,
    pub status: LoanStatus,
    pub due_date: DateTime<Utc>,
    pub repaid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Loan payment status
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Loan payment model
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct LoanPayment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub loan_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

/// Request to open a loan
#[derive(Debug, Deserialize, Validate)]
pub struct LoanRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
    #[validate(range(min = 86_400, max = 31_536_000))]
    pub duration_seconds: i64,
    pub collateral: Decimal,
}

/// Request to repay a loan in full
#[derive(Debug, Deserialize, Validate)]
pub struct RepayLoanRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
    #[validate(length(min = 1))]
    pub external_tx_id: String,
}

/// Outcome of a successful repayment
#[derive(Debug, Serialize)]
pub struct RepaymentReceipt {
    pub loan_id: Uuid,
    pub status: LoanStatus,
    pub total_due: Decimal,
    pub overpayment: Decimal,
    pub new_score: i32,
}
