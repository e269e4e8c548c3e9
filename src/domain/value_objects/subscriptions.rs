use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::enums::payment_statuses::PaymentStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionModel {
    pub id: i64,
    pub user_id: Uuid,
    pub plan_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    pub payment_status: PaymentStatus,
    pub payment_amount_minor: i32,
    pub payment_method: Option<String>,
    pub payment_ref: Option<String>,
    pub is_expired: bool,
    pub days_remaining: i64,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionModel {
    pub fn from_entity(entity: SubscriptionEntity, now: DateTime<Utc>) -> Self {
        let expired = is_expired(&entity, now);
        let days_remaining = if expired {
            0
        } else {
            (entity.ends_at - now).num_days()
        };
        Self {
            id: entity.id,
            user_id: entity.user_id,
            plan_id: entity.plan_id,
            starts_at: entity.starts_at,
            ends_at: entity.ends_at,
            is_active: entity.is_active,
            payment_status: PaymentStatus::from_str(&entity.payment_status)
                .unwrap_or(PaymentStatus::Pending),
            payment_amount_minor: entity.payment_amount_minor,
            payment_method: entity.payment_method,
            payment_ref: entity.payment_ref,
            is_expired: expired,
            days_remaining,
            created_at: entity.created_at,
        }
    }
}

/// Payment confirmation handed over by the gateway collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentModel {
    pub amount_minor: i32,
    pub method: Option<String>,
    pub payment_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeModel {
    pub user_id: Uuid,
    pub plan_id: i64,
    pub payment: PaymentModel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionFilter {
    pub payment_status: Option<PaymentStatus>,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
}

/// Raw counters the analytics view is assembled from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionCounts {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub monthly_revenue_minor: i64,
    pub total_revenue_minor: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionAnalyticsModel {
    pub total_subscriptions: i64,
    pub active_subscriptions: i64,
    pub expired_subscriptions: i64,
    pub monthly_revenue_minor: i64,
    pub total_revenue_minor: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanRevenueRow {
    pub plan_name: String,
    pub subscriptions: i64,
    pub revenue_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueStatsModel {
    pub total_revenue_minor: i64,
    pub total_subscriptions: i64,
    pub average_revenue_minor: i64,
    pub plan_breakdown: Vec<PlanRevenueRow>,
}

/// Expiry is never stored; it is computed at read time against the clock.
pub fn is_expired(subscription: &SubscriptionEntity, now: DateTime<Utc>) -> bool {
    now > subscription.ends_at
}

/// Renewal extends from the later of (now, current end), so renewing early
/// stacks the new period on top of the remaining one and renewing late
/// starts it from now. The returned end never precedes `current_end`.
pub fn renewal_period(
    now: DateTime<Utc>,
    current_end: DateTime<Utc>,
    duration_days: i32,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let new_start = current_end.max(now);
    (new_start, new_start + Duration::days(i64::from(duration_days)))
}

/// End of the first period for a fresh subscription.
pub fn initial_period(now: DateTime<Utc>, duration_days: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    (now, now + Duration::days(i64::from(duration_days)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entity(ends_at: DateTime<Utc>) -> SubscriptionEntity {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        SubscriptionEntity {
            id: 1,
            user_id: Uuid::nil(),
            plan_id: 1,
            starts_at: t0,
            ends_at,
            is_active: true,
            payment_status: "completed".to_string(),
            payment_amount_minor: 1000,
            payment_method: None,
            payment_ref: None,
            created_at: t0,
            updated_at: t0,
        }
    }

    #[test]
    fn expiry_is_strict() {
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let sub = entity(end);
        assert!(!is_expired(&sub, end));
        assert!(is_expired(&sub, end + Duration::seconds(1)));
    }

    #[test]
    fn early_renewal_stacks_on_remaining_period() {
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let (start, new_end) = renewal_period(now, end, 30);
        assert_eq!(start, end);
        assert_eq!(new_end, end + Duration::days(30));
    }

    #[test]
    fn late_renewal_starts_from_now() {
        let end = Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap();
        let now = end + Duration::days(5);
        let (start, new_end) = renewal_period(now, end, 30);
        assert_eq!(start, now);
        assert_eq!(new_end, now + Duration::days(30));
    }

    #[test]
    fn renewal_never_decreases_end_date() {
        let end = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        for offset in [-40, -1, 0, 1, 40] {
            let now = end + Duration::days(offset);
            let (_, new_end) = renewal_period(now, end, 7);
            assert!(new_end > end);
        }
    }
}
