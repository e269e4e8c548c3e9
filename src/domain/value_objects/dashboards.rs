use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{
    plans::PlanModel,
    subscriptions::{RevenueStatsModel, SubscriptionAnalyticsModel, SubscriptionModel},
    usage::{MonthlyUsageModel, UsageAnalyticsModel, UsageRecordModel},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminOverviewModel {
    pub subscription_analytics: SubscriptionAnalyticsModel,
    pub usage_analytics: UsageAnalyticsModel,
    pub monthly_revenue: RevenueStatsModel,
    pub expiring_subscriptions: Vec<SubscriptionModel>,
    pub active_calls: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardWarning {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub severity: WarningSeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDashboardModel {
    pub active_subscription: Option<SubscriptionModel>,
    pub plan: Option<PlanModel>,
    pub usage_percentage: f64,
    pub current_month_usage: MonthlyUsageModel,
    pub recent_usage: Vec<UsageRecordModel>,
    pub warnings: Vec<DashboardWarning>,
}

/// First instant of the month `now` falls in.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

/// Cap warnings kick in at 90 % consumption and escalate at 95 %.
pub fn cap_warning(kind: &str, percentage: f64) -> Option<DashboardWarning> {
    if percentage < 90.0 {
        return None;
    }
    Some(DashboardWarning {
        kind: kind.to_string(),
        message: format!("You've used {:.1}% of your {}", percentage, kind),
        severity: if percentage >= 95.0 {
            WarningSeverity::High
        } else {
            WarningSeverity::Medium
        },
    })
}

/// Expiry warnings start 7 days out and escalate inside 3 days.
pub fn expiry_warning(days_remaining: i64) -> Option<DashboardWarning> {
    if days_remaining > 7 {
        return None;
    }
    Some(DashboardWarning {
        kind: "subscription_expiry".to_string(),
        message: format!("Your subscription expires in {} days", days_remaining),
        severity: if days_remaining <= 3 {
            WarningSeverity::High
        } else {
            WarningSeverity::Medium
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_start_truncates_to_first_day() {
        let now = Utc.with_ymd_and_hms(2025, 3, 17, 13, 45, 9).unwrap();
        assert_eq!(
            month_start(now),
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn cap_warning_thresholds() {
        assert!(cap_warning("call limit", 89.9).is_none());
        assert_eq!(
            cap_warning("call limit", 90.0).unwrap().severity,
            WarningSeverity::Medium
        );
        assert_eq!(
            cap_warning("call limit", 95.0).unwrap().severity,
            WarningSeverity::High
        );
    }

    #[test]
    fn expiry_warning_thresholds() {
        assert!(expiry_warning(8).is_none());
        assert_eq!(expiry_warning(7).unwrap().severity, WarningSeverity::Medium);
        assert_eq!(expiry_warning(3).unwrap().severity, WarningSeverity::High);
    }
}
