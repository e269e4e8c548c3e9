use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::usage_records::UsageRecordEntity,
    value_objects::enums::{call_directions::CallDirection, call_statuses::CallStatus},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecordModel {
    pub id: i64,
    pub user_id: Uuid,
    pub subscription_id: Option<i64>,
    pub call_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_sec: Option<i32>,
    pub status: CallStatus,
    pub caller_number: String,
    pub destination_number: String,
    pub direction: CallDirection,
    pub created_at: DateTime<Utc>,
}

impl From<UsageRecordEntity> for UsageRecordModel {
    fn from(entity: UsageRecordEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            subscription_id: entity.subscription_id,
            call_id: entity.call_id,
            start_time: entity.start_time,
            end_time: entity.end_time,
            duration_sec: entity.duration_sec,
            status: CallStatus::from_str(&entity.status).unwrap_or(CallStatus::Failed),
            caller_number: entity.caller_number,
            destination_number: entity.destination_number,
            direction: CallDirection::from_str(&entity.direction)
                .unwrap_or(CallDirection::Outbound),
            created_at: entity.created_at,
        }
    }
}

/// Call metadata delivered by the telephony webhook when a call begins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartCallModel {
    pub user_id: Uuid,
    pub call_id: String,
    pub start_time: DateTime<Utc>,
    pub caller_number: String,
    pub destination_number: String,
    pub direction: CallDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndCallModel {
    pub end_time: DateTime<Utc>,
    pub status: CallStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageFilter {
    pub status: Option<CallStatus>,
    pub direction: Option<CallDirection>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
}

/// Consumption already booked against one subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub calls: i64,
    pub seconds: i64,
}

impl UsageTotals {
    pub fn minutes(&self) -> i64 {
        self.seconds / 60
    }
}

/// Cap check against a plan. Caps of 0 mean unlimited and can never be
/// exceeded.
pub fn caps_exceeded(totals: UsageTotals, max_calls: i32, max_minutes: i32) -> bool {
    let calls_capped = max_calls > 0 && totals.calls >= i64::from(max_calls);
    let minutes_capped = max_minutes > 0 && totals.minutes() >= i64::from(max_minutes);
    calls_capped || minutes_capped
}

/// max(calls ratio, minutes ratio) as a percentage; 0.0 when both caps are
/// unlimited.
pub fn usage_percentage(totals: UsageTotals, max_calls: i32, max_minutes: i32) -> f64 {
    let call_pct = if max_calls > 0 {
        totals.calls as f64 / f64::from(max_calls) * 100.0
    } else {
        0.0
    };
    let minute_pct = if max_minutes > 0 {
        totals.minutes() as f64 / f64::from(max_minutes) * 100.0
    } else {
        0.0
    };
    call_pct.max(minute_pct)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MonthlyUsageModel {
    pub year: i32,
    pub month: u32,
    pub total_calls: i64,
    pub total_duration_sec: i64,
    pub total_duration_minutes: f64,
    pub avg_duration_sec: f64,
    pub direction_breakdown: BTreeMap<String, i64>,
    pub status_breakdown: BTreeMap<String, i64>,
}

impl MonthlyUsageModel {
    /// Aggregates one month of ledger entries. Open calls contribute to the
    /// call count but not to duration totals.
    pub fn aggregate(year: i32, month: u32, records: &[UsageRecordEntity]) -> Self {
        let total_calls = records.len() as i64;
        let total_duration_sec: i64 = records
            .iter()
            .filter_map(|r| r.duration_sec)
            .map(i64::from)
            .sum();
        let closed = records.iter().filter(|r| r.duration_sec.is_some()).count() as i64;
        let avg_duration_sec = if closed > 0 {
            total_duration_sec as f64 / closed as f64
        } else {
            0.0
        };

        let mut direction_breakdown = BTreeMap::new();
        let mut status_breakdown = BTreeMap::new();
        for record in records {
            *direction_breakdown
                .entry(record.direction.clone())
                .or_insert(0) += 1;
            *status_breakdown.entry(record.status.clone()).or_insert(0) += 1;
        }

        Self {
            year,
            month,
            total_calls,
            total_duration_sec,
            total_duration_minutes: total_duration_sec as f64 / 60.0,
            avg_duration_sec,
            direction_breakdown,
            status_breakdown,
        }
    }
}

/// System-wide ledger rollup over a trailing window, for the admin
/// overview.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageAnalyticsModel {
    pub period_days: i64,
    pub total_calls: i64,
    pub total_duration_sec: i64,
    pub avg_duration_sec: f64,
    pub direction_breakdown: BTreeMap<String, i64>,
    pub status_breakdown: BTreeMap<String, i64>,
}

impl UsageAnalyticsModel {
    /// Open calls contribute to the call count but not to duration totals.
    pub fn aggregate(period_days: i64, records: &[UsageRecordEntity]) -> Self {
        let total_calls = records.len() as i64;
        let total_duration_sec: i64 = records
            .iter()
            .filter_map(|r| r.duration_sec)
            .map(i64::from)
            .sum();
        let closed = records.iter().filter(|r| r.duration_sec.is_some()).count() as i64;
        let avg_duration_sec = if closed > 0 {
            total_duration_sec as f64 / closed as f64
        } else {
            0.0
        };

        let mut direction_breakdown = BTreeMap::new();
        let mut status_breakdown = BTreeMap::new();
        for record in records {
            *direction_breakdown
                .entry(record.direction.clone())
                .or_insert(0) += 1;
            *status_breakdown.entry(record.status.clone()).or_insert(0) += 1;
        }

        Self {
            period_days,
            total_calls,
            total_duration_sec,
            avg_duration_sec,
            direction_breakdown,
            status_breakdown,
        }
    }
}
