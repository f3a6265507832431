//! Subscription lookup and monthly AI usage accounting
//!
//! Free users get [`FREE_MONTHLY_AI_ACTIONS`] AI actions per calendar month
//! (UTC). The counter lives on the `subscriptions` row next to the timestamp
//! of its last reset; the first request in a new month zeroes it.
//!
//! Consumption is a single conditional `UPDATE ... WHERE ai_usage_count < ?`,
//! so concurrent requests from one user cannot push the counter past the
//! limit. A caller that consumed an action and then failed hands it back
//! with [`release`], which only touches the period the action came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Plan, Subscription, SubscriptionStatus};
use crate::{time, Error, Result};

/// Monthly AI action allowance on the free plan
pub const FREE_MONTHLY_AI_ACTIONS: i64 = 5;

/// Usage figures returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub plan: Plan,
    pub used: i64,
    /// `None` when the plan is unlimited
    pub limit: Option<i64>,
    pub remaining: Option<i64>,
}

impl UsageSummary {
    pub fn for_subscription(sub: &Subscription, free_limit: i64) -> Self {
        Self::from_parts(sub.effective_plan(), sub.ai_usage_count, free_limit)
    }

    /// Summary as it will read after any pending monthly reset, without writing
    pub fn projected(sub: &Subscription, free_limit: i64, now: DateTime<Utc>) -> Self {
        let used = if needs_monthly_reset(sub.ai_usage_reset_at, now) {
            0
        } else {
            sub.ai_usage_count
        };
        Self::from_parts(sub.effective_plan(), used, free_limit)
    }

    fn from_parts(plan: Plan, used: i64, free_limit: i64) -> Self {
        match plan {
            Plan::Pro => Self {
                plan,
                used,
                limit: None,
                remaining: None,
            },
            Plan::Free => Self {
                plan,
                used,
                limit: Some(free_limit),
                remaining: Some((free_limit - used).max(0)),
            },
        }
    }
}

/// True when the counter was last reset in an earlier calendar month
pub fn needs_monthly_reset(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    time::is_earlier_month(reset_at, now)
}

pub async fn get_subscription(pool: &SqlitePool, user_id: Uuid) -> Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE user_id = ?")
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?;
    Ok(sub)
}

/// Fetch the caller's subscription, creating a free one on first use
pub async fn get_or_create_subscription(
    pool: &SqlitePool,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Subscription> {
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO subscriptions
            (user_id, plan, status, ai_usage_count, ai_usage_reset_at, created_at, updated_at)
        VALUES (?, 'free', 'active', 0, ?, ?, ?)
        "#,
    )
    .bind(user_id.to_string())
    .bind(now)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .rows_affected();

    if inserted > 0 {
        info!(user_id = %user_id, "Created free subscription");
    }

    get_subscription(pool, user_id)
        .await?
        .ok_or_else(|| Error::Internal(format!("subscription for {} vanished", user_id)))
}

/// Zero the counter if `sub` was last reset in an earlier month
///
/// Updates `sub` in place and returns whether a reset happened. The write is
/// guarded on the reset timestamp that was read, so a reset already applied
/// by a concurrent request (and any usage it recorded since) is kept.
pub async fn reset_if_new_month(
    pool: &SqlitePool,
    sub: &mut Subscription,
    now: DateTime<Utc>,
) -> Result<bool> {
    if !needs_monthly_reset(sub.ai_usage_reset_at, now) {
        return Ok(false);
    }

    let updated = sqlx::query(
        r#"
        UPDATE subscriptions
        SET ai_usage_count = 0, ai_usage_reset_at = ?, updated_at = ?
        WHERE user_id = ? AND ai_usage_reset_at = ?
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(sub.user_id.to_string())
    .bind(sub.ai_usage_reset_at)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        let fresh = get_subscription(pool, sub.user_id)
            .await?
            .ok_or_else(|| Error::not_found("subscription for user", sub.user_id))?;

        if !needs_monthly_reset(fresh.ai_usage_reset_at, now) {
            *sub = fresh;
            return Ok(false);
        }

        // Stored timestamp text differs from what we bind; reset unconditionally
        sqlx::query(
            "UPDATE subscriptions SET ai_usage_count = 0, ai_usage_reset_at = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(sub.user_id.to_string())
        .execute(pool)
        .await?;
    }

    debug!(
        user_id = %sub.user_id,
        previous_count = sub.ai_usage_count,
        "Monthly AI usage counter reset"
    );

    sub.ai_usage_count = 0;
    sub.ai_usage_reset_at = now;
    sub.updated_at = now;
    Ok(true)
}

/// One action taken from the monthly allowance
///
/// Remembers the counter period it was taken from, so handing it back
/// after a monthly reset is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub user_id: Uuid,
    /// `ai_usage_reset_at` exactly as stored when the action was taken
    period: String,
}

/// Consume one action if the counter is below `limit`
///
/// Returns `None` when the limit is already reached.
pub async fn try_consume(
    pool: &SqlitePool,
    user_id: Uuid,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<Option<Reservation>> {
    let period: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE subscriptions
        SET ai_usage_count = ai_usage_count + 1, updated_at = ?
        WHERE user_id = ? AND ai_usage_count < ?
        RETURNING ai_usage_reset_at
        "#,
    )
    .bind(now)
    .bind(user_id.to_string())
    .bind(limit)
    .fetch_optional(pool)
    .await?;

    Ok(period.map(|period| Reservation { user_id, period }))
}

/// Hand back an action taken by [`try_consume`] (floored at zero)
///
/// Returns `false` when the counter was reset since the action was taken;
/// the new period's count is left alone.
pub async fn release(
    pool: &SqlitePool,
    reservation: &Reservation,
    now: DateTime<Utc>,
) -> Result<bool> {
    let updated = sqlx::query(
        r#"
        UPDATE subscriptions
        SET ai_usage_count = MAX(ai_usage_count - 1, 0), updated_at = ?
        WHERE user_id = ? AND ai_usage_reset_at = ?
        "#,
    )
    .bind(now)
    .bind(reservation.user_id.to_string())
    .bind(&reservation.period)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        debug!(
            user_id = %reservation.user_id,
            "Usage counter reset since reservation; nothing to release"
        );
    }
    Ok(updated == 1)
}

/// Record a plan change coming from billing
pub async fn set_plan(
    pool: &SqlitePool,
    user_id: Uuid,
    plan: Plan,
    status: SubscriptionStatus,
    current_period_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Subscription> {
    get_or_create_subscription(pool, user_id, now).await?;

    sqlx::query(
        r#"
        UPDATE subscriptions
        SET plan = ?, status = ?, current_period_end = ?, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(plan.as_str())
    .bind(status.as_str())
    .bind(current_period_end)
    .bind(now)
    .bind(user_id.to_string())
    .execute(pool)
    .await?;

    info!(user_id = %user_id, plan = %plan, status = %status, "Subscription plan updated");

    get_subscription(pool, user_id)
        .await?
        .ok_or_else(|| Error::not_found("subscription for user", user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_first_use_creates_free_subscription() {
        let pool = init_memory_database().await.unwrap();
        let user = Uuid::new_v4();

        let sub = get_or_create_subscription(&pool, user, utc(2026, 3, 10)).await.unwrap();

        assert_eq!(sub.plan, Plan::Free);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.ai_usage_count, 0);
        assert_eq!(sub.ai_usage_reset_at, utc(2026, 3, 10));

        // Second call returns the same row
        let again = get_or_create_subscription(&pool, user, utc(2026, 3, 11)).await.unwrap();
        assert_eq!(again.created_at, sub.created_at);
    }

    #[tokio::test]
    async fn test_consume_stops_at_limit() {
        let pool = init_memory_database().await.unwrap();
        let user = Uuid::new_v4();
        let now = utc(2026, 3, 10);
        get_or_create_subscription(&pool, user, now).await.unwrap();

        for _ in 0..FREE_MONTHLY_AI_ACTIONS {
            assert!(try_consume(&pool, user, FREE_MONTHLY_AI_ACTIONS, now).await.unwrap().is_some());
        }
        assert!(try_consume(&pool, user, FREE_MONTHLY_AI_ACTIONS, now).await.unwrap().is_none());

        let sub = get_subscription(&pool, user).await.unwrap().unwrap();
        assert_eq!(sub.ai_usage_count, FREE_MONTHLY_AI_ACTIONS);
    }

    #[tokio::test]
    async fn test_release_is_floored_at_zero() {
        let pool = init_memory_database().await.unwrap();
        let user = Uuid::new_v4();
        let now = utc(2026, 3, 10);
        get_or_create_subscription(&pool, user, now).await.unwrap();

        let reservation = try_consume(&pool, user, 5, now).await.unwrap().unwrap();
        assert!(release(&pool, &reservation, now).await.unwrap());
        assert!(release(&pool, &reservation, now).await.unwrap());

        let sub = get_subscription(&pool, user).await.unwrap().unwrap();
        assert_eq!(sub.ai_usage_count, 0);
    }

    #[tokio::test]
    async fn test_release_after_monthly_reset_keeps_new_count() {
        let pool = init_memory_database().await.unwrap();
        let user = Uuid::new_v4();
        let end_of_march = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 50).unwrap();
        get_or_create_subscription(&pool, user, utc(2026, 3, 2)).await.unwrap();

        // Taken in March, handed back after another request opened April
        let late = try_consume(&pool, user, 5, end_of_march).await.unwrap().unwrap();

        let april = utc(2026, 4, 1);
        let mut sub = get_subscription(&pool, user).await.unwrap().unwrap();
        assert!(reset_if_new_month(&pool, &mut sub, april).await.unwrap());
        try_consume(&pool, user, 5, april).await.unwrap().unwrap();

        assert!(!release(&pool, &late, april).await.unwrap());

        let stored = get_subscription(&pool, user).await.unwrap().unwrap();
        assert_eq!(stored.ai_usage_count, 1);
    }

    #[tokio::test]
    async fn test_reset_in_new_month() {
        let pool = init_memory_database().await.unwrap();
        let user = Uuid::new_v4();
        let march = utc(2026, 3, 10);
        get_or_create_subscription(&pool, user, march).await.unwrap();
        for _ in 0..5 {
            try_consume(&pool, user, 5, march).await.unwrap();
        }

        let april = utc(2026, 4, 1);
        let mut sub = get_subscription(&pool, user).await.unwrap().unwrap();
        assert!(reset_if_new_month(&pool, &mut sub, april).await.unwrap());
        assert_eq!(sub.ai_usage_count, 0);

        let stored = get_subscription(&pool, user).await.unwrap().unwrap();
        assert_eq!(stored.ai_usage_count, 0);
        assert_eq!(stored.ai_usage_reset_at, april);

        // Already reset this month: no-op
        assert!(!reset_if_new_month(&pool, &mut sub, utc(2026, 4, 20)).await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_reset_keeps_concurrent_usage() {
        let pool = init_memory_database().await.unwrap();
        let user = Uuid::new_v4();
        get_or_create_subscription(&pool, user, utc(2026, 3, 10)).await.unwrap();

        let april = utc(2026, 4, 2);
        let mut first = get_subscription(&pool, user).await.unwrap().unwrap();
        let mut stale = first.clone();

        reset_if_new_month(&pool, &mut first, april).await.unwrap();
        try_consume(&pool, user, 5, april).await.unwrap();

        // A second request that read the row before the reset must not zero it again
        assert!(!reset_if_new_month(&pool, &mut stale, april).await.unwrap());
        assert_eq!(stale.ai_usage_count, 1);
    }

    #[tokio::test]
    async fn test_set_plan_and_summary() {
        let pool = init_memory_database().await.unwrap();
        let user = Uuid::new_v4();
        let now = utc(2026, 3, 10);

        let sub = set_plan(&pool, user, Plan::Pro, SubscriptionStatus::Active, None, now)
            .await
            .unwrap();
        assert!(sub.is_pro());

        let summary = UsageSummary::for_subscription(&sub, FREE_MONTHLY_AI_ACTIONS);
        assert_eq!(summary.plan, Plan::Pro);
        assert_eq!(summary.limit, None);
        assert_eq!(summary.remaining, None);
    }

    #[tokio::test]
    async fn test_projected_summary_applies_pending_reset() {
        let pool = init_memory_database().await.unwrap();
        let user = Uuid::new_v4();
        let march = utc(2026, 3, 10);
        get_or_create_subscription(&pool, user, march).await.unwrap();
        for _ in 0..3 {
            try_consume(&pool, user, 5, march).await.unwrap();
        }
        let sub = get_subscription(&pool, user).await.unwrap().unwrap();

        let now_summary = UsageSummary::projected(&sub, 5, utc(2026, 3, 20));
        assert_eq!(now_summary.used, 3);
        assert_eq!(now_summary.remaining, Some(2));

        let next_month = UsageSummary::projected(&sub, 5, utc(2026, 4, 1));
        assert_eq!(next_month.used, 0);
        assert_eq!(next_month.remaining, Some(5));
    }
}
