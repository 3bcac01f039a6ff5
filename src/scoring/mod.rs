//! Credit scoring for CreditVault
//!
//! Two score tracks live here and stay separate on purpose:
//!
//! - The **persisted score** (0-850) moves in discrete deltas applied by
//!   [`engine::apply_score_change`] as settlement and repayment events land.
//!   It is the score loan eligibility reads.
//! - The **composite score** is recomputed on demand from current activity as
//!   a weighted blend of four factors. It is advisory and never persisted.
//!
//! Conflating the two would break the neutral no-history defaults and the
//! discrete delta semantics, so they are distinct types and functions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

pub mod engine;

pub use engine::{apply_score_change, ScoringEngine};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Weight for payment history in the composite score (0-1)
pub const WEIGHT_PAYMENT_HISTORY: f64 = 0.35;

/// Weight for loan outcome history in the composite score (0-1)
pub const WEIGHT_LOAN_HISTORY: f64 = 0.30;

/// Weight for savings behavior in the composite score (0-1)
pub const WEIGHT_SAVINGS_BEHAVIOR: f64 = 0.20;

/// Weight for protocol activity in the composite score (0-1)
pub const WEIGHT_PROTOCOL_ACTIVITY: f64 = 0.15;

/// Lower bound of the persisted score
pub const SCORE_MIN: i32 = 0;

/// Upper bound of the persisted score
pub const SCORE_MAX: i32 = 850;

/// Penalty per defaulted loan in the loan history factor
const DEFAULT_PENALTY_PER_LOAN: f64 = 20.0;

// ============================================================================
// Data Models
// ============================================================================

/// Persisted per-user score row
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CreditScore {
    pub user_id: Uuid,
    pub score: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Discrete score mutation, applied at most once per (external_id, action)
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "score_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScoreAction {
    Payment,
    LoanRepaid,
    SavingsDeposit,
    Default,
}

impl ScoreAction {
    /// Signed delta this action applies to the persisted score
    pub fn delta(self) -> i32 {
        match self {
            ScoreAction::Payment => 5,
            ScoreAction::LoanRepaid => 20,
            ScoreAction::SavingsDeposit => 2,
            ScoreAction::Default => -50,
        }
    }
}

/// Outcome of one `apply_score_change` call. `applied` is false when the
/// (external_id, action) pair had already been recorded; the score is then
/// returned unchanged.
#[derive(Debug, Serialize, Clone, Copy)]
pub struct ScoreChange {
    pub user_id: Uuid,
    pub old_score: i32,
    pub new_score: i32,
    pub delta: i32,
    pub applied: bool,
}

/// Append-only record of one applied delta
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CreditScoreUpdate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub old_score: i32,
    pub new_score: i32,
    pub delta: i32,
    pub action: ScoreAction,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only score snapshot for trend queries
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct CreditScoreHistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub score: i32,
    pub recorded_at: DateTime<Utc>,
}

/// Raw per-user activity counts the factor computation runs on
#[derive(Debug, Clone, Default)]
pub struct CreditActivity {
    pub total_payments: i64,
    pub on_time_payments: i64,
    pub total_loans: i64,
    pub repaid_loans: i64,
    pub defaulted_loans: i64,
    pub savings_balance: Decimal,
    pub savings_age_days: i64,
    pub tx_count: i64,
}

/// Per-factor breakdown plus the advisory composite
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreditFactors {
    /// Share of loan payments completed on time (0-100)
    pub payment_history: f64,

    /// Loan outcomes: repayments reward, defaults penalize (0-100)
    pub loan_history: f64,

    /// Savings balance and account age (0-100)
    pub savings_behavior: f64,

    /// Breadth of platform usage by transaction count (0-100)
    pub protocol_activity: f64,

    /// Weighted composite of the four factors, rounded. Advisory only;
    /// distinct from the persisted score.
    pub overall_score: i32,
}

/// Rating bands over the persisted score
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CreditRating {
    Excellent,
    VeryGood,
    Good,
    Fair,
    Poor,
}

impl CreditRating {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 800 => CreditRating::Excellent,
            s if s >= 740 => CreditRating::VeryGood,
            s if s >= 670 => CreditRating::Good,
            s if s >= 580 => CreditRating::Fair,
            _ => CreditRating::Poor,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CreditRating::Excellent => "Excellent standing across payments, loans, and savings",
            CreditRating::VeryGood => "Very good standing with a consistent repayment record",
            CreditRating::Good => "Good standing with minor gaps in history",
            CreditRating::Fair => "Fair standing, limited or mixed history",
            CreditRating::Poor => "Poor standing or defaults on record",
        }
    }
}

/// Actionable improvement suggestion derived from the factor breakdown
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Recommendation {
    pub action: String,
    pub priority: Priority,
    pub timeframe: String,
}

/// Recommendation priority levels
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Full credit report returned by the read API
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreditProfile {
    pub user_id: Uuid,
    /// Persisted score, moved only by discrete deltas
    pub score: i32,
    pub rating: CreditRating,
    pub factors: CreditFactors,
    pub recommendations: Vec<Recommendation>,
    pub calculated_at: DateTime<Utc>,
}

// ============================================================================
// Pure Computation
// ============================================================================

/// Clamp a candidate persisted score into [SCORE_MIN, SCORE_MAX]
pub fn clamp_score(score: i32) -> i32 {
    score.clamp(SCORE_MIN, SCORE_MAX)
}

/// Cache key under which a user's credit profile is stored
pub fn profile_cache_key(user_id: Uuid) -> String {
    format!("credit:profile:{}", user_id)
}

/// Compute the factor breakdown from raw activity. Side-effect free.
///
/// Users without history score neutrally: no payments and no loans both
/// yield 100, not 0.
pub fn compute_factors(activity: &CreditActivity) -> CreditFactors {
    let payment_history = if activity.total_payments == 0 {
        100.0
    } else {
        100.0 * activity.on_time_payments as f64 / activity.total_payments as f64
    };

    let loan_history = if activity.total_loans == 0 {
        100.0
    } else {
        let repaid_share = 100.0 * activity.repaid_loans as f64 / activity.total_loans as f64;
        (repaid_share - DEFAULT_PENALTY_PER_LOAN * activity.defaulted_loans as f64).max(0.0)
    };

    let mut savings_behavior: f64 = 50.0;
    if activity.savings_balance > Decimal::from(1_000) {
        savings_behavior += 20.0;
    }
    if activity.savings_balance > Decimal::from(10_000) {
        savings_behavior += 15.0;
    }
    if activity.savings_age_days > 30 {
        savings_behavior += 10.0;
    }
    if activity.savings_age_days > 90 {
        savings_behavior += 5.0;
    }
    let savings_behavior = savings_behavior.min(100.0);

    let mut protocol_activity = (2.0 * activity.tx_count as f64).min(50.0);
    if activity.tx_count > 10 {
        protocol_activity += 10.0;
    }
    if activity.tx_count > 50 {
        protocol_activity += 10.0;
    }
    let protocol_activity = protocol_activity.min(100.0);

    let overall_score = (WEIGHT_PAYMENT_HISTORY * payment_history
        + WEIGHT_LOAN_HISTORY * loan_history
        + WEIGHT_SAVINGS_BEHAVIOR * savings_behavior
        + WEIGHT_PROTOCOL_ACTIVITY * protocol_activity)
        .round() as i32;

    CreditFactors {
        payment_history,
        loan_history,
        savings_behavior,
        protocol_activity,
        overall_score,
    }
}

/// Derive improvement recommendations from factors and activity. Pure.
pub fn recommendations(factors: &CreditFactors, activity: &CreditActivity) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if factors.payment_history < 80.0 {
        out.push(Recommendation {
            action: "Make loan payments on time".to_string(),
            priority: Priority::High,
            timeframe: "3-6 months".to_string(),
        });
    }

    if activity.savings_balance < Decimal::from(1_000) {
        out.push(Recommendation {
            action: "Increase your savings balance".to_string(),
            priority: Priority::Medium,
            timeframe: "1-3 months".to_string(),
        });
    }

    if activity.tx_count < 10 {
        out.push(Recommendation {
            action: "Increase your protocol activity".to_string(),
            priority: Priority::Low,
            timeframe: "1-2 months".to_string(),
        });
    }

    out
}
