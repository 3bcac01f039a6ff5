//! Storage-backed scoring engine
//!
//! Reads gather activity from the ledger store; the one mutation,
//! [`apply_score_change`], composes into the caller's transaction so a score
//! delta commits or rolls back together with the event that caused it.

use rust_decimal::Decimal;
use sqlx::types::chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::ApiError;

use super::{
    clamp_score, compute_factors, profile_cache_key, recommendations, CreditActivity,
    CreditProfile, CreditRating, ScoreAction, ScoreChange,
};

/// Raw loan payment statistics from the ledger store
#[derive(Debug, sqlx::FromRow)]
struct PaymentStats {
    total: Option<i64>,
    on_time: Option<i64>,
}

/// Raw loan outcome statistics from the ledger store
#[derive(Debug, sqlx::FromRow)]
struct LoanStats {
    total: Option<i64>,
    repaid: Option<i64>,
    defaulted: Option<i64>,
}

/// Aggregated savings position
#[derive(Debug, sqlx::FromRow)]
struct SavingsStats {
    balance: Decimal,
    opened_at: Option<sqlx::types::chrono::DateTime<Utc>>,
}

/// Credit scoring engine service
#[derive(Clone)]
pub struct ScoringEngine {
    db_pool: PgPool,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
}

impl ScoringEngine {
    /// Create a new scoring engine instance
    pub fn new(db_pool: PgPool, cache: Arc<dyn Cache>, cache_ttl: Duration) -> Self {
        Self {
            db_pool,
            cache,
            cache_ttl,
        }
    }

    /// Read-only credit report: persisted score, rating, factor breakdown,
    /// recommendations. Served from cache when possible; recomputed
    /// otherwise. Never mutates.
    pub async fn credit_profile(&self, user_id: Uuid) -> Result<CreditProfile, ApiError> {
        let cache_key = profile_cache_key(user_id);
        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok(profile) = serde_json::from_str::<CreditProfile>(&cached) {
                return Ok(profile);
            }
        }

        self.ensure_user_exists(user_id).await?;

        let score = self.persisted_score(user_id).await?;
        let activity = self.gather_activity(user_id).await?;
        let factors = compute_factors(&activity);
        let recommendations = recommendations(&factors, &activity);

        let profile = CreditProfile {
            user_id,
            score,
            rating: CreditRating::from_score(score),
            factors,
            recommendations,
            calculated_at: Utc::now(),
        };

        if let Ok(serialized) = serde_json::to_string(&profile) {
            self.cache.set(&cache_key, serialized, self.cache_ttl).await;
        }

        Ok(profile)
    }

    /// Current persisted score for a user; 0 when no score row exists yet
    pub async fn persisted_score(&self, user_id: Uuid) -> Result<i32, ApiError> {
        let score: Option<i32> =
            sqlx::query_scalar("SELECT score FROM credit_scores WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.db_pool)
                .await?;

        Ok(score.unwrap_or(0))
    }

    /// Drop the cached profile after a committed score mutation
    pub async fn invalidate_profile(&self, user_id: Uuid) {
        self.cache.invalidate(&profile_cache_key(user_id)).await;
    }

    /// Score snapshots for trend queries, most recent first
    pub async fn score_history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<super::CreditScoreHistoryEntry>, ApiError> {
        self.ensure_user_exists(user_id).await?;

        let history = sqlx::query_as::<_, super::CreditScoreHistoryEntry>(
            r#"
            SELECT id, user_id, score, recorded_at
            FROM credit_score_history
            WHERE user_id = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(history)
    }

    async fn ensure_user_exists(&self, user_id: Uuid) -> Result<(), ApiError> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await?;

        exists
            .map(|_| ())
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))
    }

    /// Gather the raw activity counts the factor computation runs on
    pub async fn gather_activity(&self, user_id: Uuid) -> Result<CreditActivity, ApiError> {
        let payments = sqlx::query_as::<_, PaymentStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'completed') AS on_time
            FROM loan_payments
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        let loans = sqlx::query_as::<_, LoanStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'repaid') AS repaid,
                COUNT(*) FILTER (WHERE status = 'defaulted') AS defaulted
            FROM loans
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        let savings = sqlx::query_as::<_, SavingsStats>(
            r#"
            SELECT
                COALESCE(SUM(balance), 0) AS balance,
                MIN(created_at) AS opened_at
            FROM savings_balances
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        let tx_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transactions WHERE user_id = $1 AND status = 'completed'",
        )
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        let savings_age_days = savings
            .opened_at
            .map(|opened| (Utc::now() - opened).num_days())
            .unwrap_or(0);

        Ok(CreditActivity {
            total_payments: payments.total.unwrap_or(0),
            on_time_payments: payments.on_time.unwrap_or(0),
            total_loans: loans.total.unwrap_or(0),
            repaid_loans: loans.repaid.unwrap_or(0),
            defaulted_loans: loans.defaulted.unwrap_or(0),
            savings_balance: savings.balance,
            savings_age_days,
            tx_count,
        })
    }
}

/// Apply one discrete score delta inside the caller's transaction.
///
/// The score row is locked `FOR UPDATE`, so concurrent changes for the same
/// user serialize and none is lost. The delta is gated by inserting the
/// update row first: the unique index on (external_id, action) turns a replay
/// into a conflict, and the function then reports the current score with
/// `applied: false` instead of moving it twice. Update, history, and score
/// row all commit together with the caller.
pub async fn apply_score_change(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    action: ScoreAction,
    external_id: Option<&str>,
) -> Result<ScoreChange, ApiError> {
    sqlx::query(
        "INSERT INTO credit_scores (user_id, score) VALUES ($1, 0) ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    let old_score: i32 =
        sqlx::query_scalar("SELECT score FROM credit_scores WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_one(&mut **tx)
            .await?;

    let delta = action.delta();
    let new_score = clamp_score(old_score + delta);

    let recorded: Option<Uuid> = sqlx::query_scalar(
        r#"
        INSERT INTO credit_score_updates (id, user_id, old_score, new_score, delta, action, external_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (external_id, action) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(old_score)
    .bind(new_score)
    .bind(delta)
    .bind(action)
    .bind(external_id)
    .fetch_optional(&mut **tx)
    .await?;

    if recorded.is_none() {
        tracing::info!(
            %user_id,
            ?action,
            external_id = external_id.unwrap_or(""),
            "Score delta already applied, skipping"
        );
        return Ok(ScoreChange {
            user_id,
            old_score,
            new_score: old_score,
            delta: 0,
            applied: false,
        });
    }

    sqlx::query("UPDATE credit_scores SET score = $1, updated_at = NOW() WHERE user_id = $2")
        .bind(new_score)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

    sqlx::query("INSERT INTO credit_score_history (id, user_id, score) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(new_score)
        .execute(&mut **tx)
        .await?;

    tracing::info!(
        %user_id,
        ?action,
        old_score,
        new_score,
        "Applied credit score change"
    );

    Ok(ScoreChange {
        user_id,
        old_score,
        new_score,
        delta,
        applied: true,
    })
}
