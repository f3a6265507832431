//! Subscription rows: plan, status and the monthly AI usage counter

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use super::{enum_column, text_enum, uuid_column};

text_enum! {
    /// Subscription tier
    Plan {
        Free => "free",
        Pro => "pro",
    }
}

text_enum! {
    /// Billing status mirrored from the payment provider
    SubscriptionStatus {
        Active => "active",
        Trialing => "trialing",
        PastDue => "past_due",
        Canceled => "canceled",
    }
}

/// One row of `subscriptions` (one per user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: Uuid,
    pub plan: Plan,
    pub status: SubscriptionStatus,
    /// AI actions consumed since `ai_usage_reset_at`
    pub ai_usage_count: i64,
    pub ai_usage_reset_at: DateTime<Utc>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Pro entitlements apply only while the subscription is in good standing
    pub fn is_pro(&self) -> bool {
        self.plan == Plan::Pro
            && matches!(
                self.status,
                SubscriptionStatus::Active | SubscriptionStatus::Trialing
            )
    }

    /// Plan whose limits apply right now
    pub fn effective_plan(&self) -> Plan {
        if self.is_pro() {
            Plan::Pro
        } else {
            Plan::Free
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Subscription {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: uuid_column(row, "user_id")?,
            plan: enum_column(row, "plan")?,
            status: enum_column(row, "status")?,
            ai_usage_count: row.try_get("ai_usage_count")?,
            ai_usage_reset_at: row.try_get("ai_usage_reset_at")?,
            current_period_end: row.try_get("current_period_end")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
