//! Loan service layer - pricing, collateral checks, and repayment settlement

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::ApiError;
use crate::loan::{Loan, LoanRequest, LoanStatus, PaymentStatus, RepayLoanRequest, RepaymentReceipt};
use crate::scoring::{self, ScoreAction};

/// Shortest acceptable loan term: one day
pub const MIN_DURATION_SECONDS: i64 = 86_400;

/// Longest acceptable loan term: one 365-day year
pub const MAX_DURATION_SECONDS: i64 = SECONDS_PER_YEAR;

/// Seconds in the 365-day year interest accrues over
pub const SECONDS_PER_YEAR: i64 = 31_536_000;

/// Base annual interest rate in whole percent
pub const BASE_RATE: i32 = 10;

/// Interest rate floor in whole percent
pub const MIN_RATE: i32 = 5;

/// Interest rate ceiling in whole percent
pub const MAX_RATE: i32 = 25;

/// Minimum collateral as a percentage of the principal
pub const MIN_COLLATERAL_RATIO: i64 = 150;

// ============================================================================
// Pricing
// ============================================================================

/// Minimum persisted credit score required for a principal of this size
pub fn min_credit_score(amount: Decimal) -> i32 {
    if amount <= Decimal::from(1_000) {
        500
    } else if amount <= Decimal::from(5_000) {
        600
    } else if amount <= Decimal::from(10_000) {
        650
    } else {
        700
    }
}

/// Price the annual interest rate in whole percent.
///
/// Starts from the base rate and applies one adjustment per band: the
/// highest matching score tier, amount tier, and duration tier each apply
/// exactly once. The result is clamped to [MIN_RATE, MAX_RATE].
pub fn interest_rate(score: i32, amount: Decimal, duration_seconds: i64) -> i32 {
    let mut rate = BASE_RATE;

    rate += if score >= 750 {
        -3
    } else if score >= 650 {
        -1
    } else if score < 550 {
        5
    } else {
        0
    };

    rate += if amount > Decimal::from(50_000) {
        2
    } else if amount > Decimal::from(10_000) {
        1
    } else {
        0
    };

    let duration_days = duration_seconds / 86_400;
    rate += if duration_days > 365 {
        2
    } else if duration_days > 180 {
        1
    } else {
        0
    };

    rate.clamp(MIN_RATE, MAX_RATE)
}

/// Collateral value as a percentage of the principal
pub fn collateral_ratio(collateral: Decimal, amount: Decimal) -> Decimal {
    collateral / amount * Decimal::from(100)
}

/// Total owed at repayment: simple interest over the full original term,
/// `principal * (1 + rate/100 * duration/SECONDS_PER_YEAR)`
pub fn total_due(principal: Decimal, interest_rate: i32, duration_seconds: i64) -> Decimal {
    let interest_fraction = Decimal::from(interest_rate) / Decimal::from(100)
        * Decimal::from(duration_seconds)
        / Decimal::from(SECONDS_PER_YEAR);
    principal * (Decimal::ONE + interest_fraction)
}

// ============================================================================
// Loan Service
// ============================================================================

/// Loan service for managing the loan lifecycle
#[derive(Clone)]
pub struct LoanService {
    db_pool: PgPool,
    cache: Arc<dyn Cache>,
}

impl LoanService {
    /// Create a new loan service instance
    pub fn new(db_pool: PgPool, cache: Arc<dyn Cache>) -> Self {
        Self { db_pool, cache }
    }

    /// Open a loan in `requested` status.
    ///
    /// Checks run in order: input validation, credit eligibility against the
    /// persisted score, pricing, collateral ratio. Each rejection carries its
    /// comparison values and leaves no partial state behind.
    pub async fn request_loan(&self, request: LoanRequest) -> Result<Loan, ApiError> {
        if request.duration_seconds < MIN_DURATION_SECONDS
            || request.duration_seconds > MAX_DURATION_SECONDS
        {
            return Err(ApiError::ValidationError(format!(
                "Loan duration must be between {} and {} seconds",
                MIN_DURATION_SECONDS, MAX_DURATION_SECONDS
            )));
        }
        if request.amount <= Decimal::ZERO {
            return Err(ApiError::ValidationError(
                "Loan amount must be positive".to_string(),
            ));
        }
        if request.collateral <= Decimal::ZERO {
            return Err(ApiError::ValidationError(
                "Collateral must be positive".to_string(),
            ));
        }

        let score = self.persisted_score(request.user_id).await?;
        let required = min_credit_score(request.amount);
        if score < required {
            return Err(ApiError::InsufficientCredit {
                current: score,
                required,
            });
        }

        let rate = interest_rate(score, request.amount, request.duration_seconds);

        let ratio = collateral_ratio(request.collateral, request.amount);
        let required_ratio = Decimal::from(MIN_COLLATERAL_RATIO);
        if ratio < required_ratio {
            return Err(ApiError::InsufficientCollateral {
                ratio,
                required: required_ratio,
            });
        }

        let due_date = Utc::now() + Duration::seconds(request.duration_seconds);

        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (
                id, user_id, principal, interest_rate, duration_seconds,
                collateral, status, due_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.user_id)
        .bind(request.amount)
        .bind(rate)
        .bind(request.duration_seconds)
        .bind(request.collateral)
        .bind(LoanStatus::Requested)
        .bind(due_date)
        .fetch_one(&self.db_pool)
        .await?;

        tracing::info!(
            loan_id = %loan.id,
            user_id = %loan.user_id,
            principal = %loan.principal,
            interest_rate = loan.interest_rate,
            "Loan requested"
        );

        Ok(loan)
    }

    /// Settle an active loan in full.
    ///
    /// The payment must cover the total due (principal plus simple interest
    /// over the original term). Status change, payment record, and the
    /// `loan_repaid` score delta commit atomically; redelivery with the same
    /// external transaction id cannot move the score twice.
    pub async fn repay_loan(
        &self,
        loan_id: Uuid,
        request: RepayLoanRequest,
    ) -> Result<RepaymentReceipt, ApiError> {
        if request.amount <= Decimal::ZERO {
            return Err(ApiError::ValidationError(
                "Repayment amount must be positive".to_string(),
            ));
        }
        if request.external_tx_id.trim().is_empty() {
            return Err(ApiError::ValidationError(
                "External transaction id must not be empty".to_string(),
            ));
        }

        let mut tx = self.db_pool.begin().await?;

        let loan: Option<Loan> = sqlx::query_as("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
            .bind(loan_id)
            .fetch_optional(&mut *tx)
            .await?;

        // A loan owned by someone else is indistinguishable from a missing one
        let loan = match loan {
            Some(loan) if loan.user_id == request.user_id => loan,
            _ => return Err(ApiError::NotFound(format!("Loan {} not found", loan_id))),
        };

        if loan.status != LoanStatus::Active {
            return Err(ApiError::InvalidState(format!(
                "Loan {} is not active",
                loan_id
            )));
        }

        let total_due = total_due(loan.principal, loan.interest_rate, loan.duration_seconds);
        if request.amount < total_due {
            return Err(ApiError::InsufficientPayment {
                shortfall: total_due - request.amount,
            });
        }
        let overpayment = request.amount - total_due;

        sqlx::query(
            "UPDATE loans SET status = $1, repaid_at = NOW(), updated_at = NOW() WHERE id = $2",
        )
        .bind(LoanStatus::Repaid)
        .bind(loan.id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO loan_payments (id, user_id, loan_id, amount, status, external_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(loan.user_id)
        .bind(loan.id)
        .bind(request.amount)
        .bind(PaymentStatus::Completed)
        .bind(&request.external_tx_id)
        .execute(&mut *tx)
        .await?;

        let change = scoring::apply_score_change(
            &mut tx,
            loan.user_id,
            ScoreAction::LoanRepaid,
            Some(&request.external_tx_id),
        )
        .await?;

        tx.commit().await?;

        self.cache
            .invalidate(&scoring::profile_cache_key(loan.user_id))
            .await;

        tracing::info!(
            loan_id = %loan.id,
            user_id = %loan.user_id,
            amount = %request.amount,
            %overpayment,
            "Loan repaid"
        );

        Ok(RepaymentReceipt {
            loan_id: loan.id,
            status: LoanStatus::Repaid,
            total_due,
            overpayment,
            new_score: change.new_score,
        })
    }

    /// Get loan by ID, scoped to its owner
    pub async fn get_loan(&self, loan_id: Uuid, user_id: Uuid) -> Result<Loan, ApiError> {
        let loan: Option<Loan> =
            sqlx::query_as("SELECT * FROM loans WHERE id = $1 AND user_id = $2")
                .bind(loan_id)
                .bind(user_id)
                .fetch_optional(&self.db_pool)
                .await?;

        loan.ok_or_else(|| ApiError::NotFound(format!("Loan {} not found", loan_id)))
    }

    async fn persisted_score(&self, user_id: Uuid) -> Result<i32, ApiError> {
        let known_user: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;
        if known_user.is_none() {
            return Err(ApiError::NotFound(format!("User {} not found", user_id)));
        }

        let score: Option<i32> =
            sqlx::query_scalar("SELECT score FROM credit_scores WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.db_pool)
                .await?;

        Ok(score.unwrap_or(0))
    }
}
