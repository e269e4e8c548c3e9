use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::usage_records::{InsertUsageRecordEntity, UsageRecordEntity},
    value_objects::{
        enums::call_statuses::CallStatus,
        usage::{UsageFilter, UsageTotals},
    },
};

/// Plan caps to enforce while inserting a call, resolved from the caller's
/// active subscription before the transaction starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageGuard {
    pub subscription_id: i64,
    pub max_calls: i32,
    pub max_minutes: i32,
}

#[derive(Debug, Clone)]
pub enum StartCallOutcome {
    Started(UsageRecordEntity),
    DuplicateCallId,
    LimitExceeded,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageRepository: Send + Sync {
    /// Inserts the record, rejecting duplicate call ids and, when a guard is
    /// present, consumption at or beyond the plan caps. Duplicate check, cap
    /// check and insert run in one transaction with the subscription row
    /// locked so two concurrent call starts cannot both pass the cap.
    async fn insert_guarded(
        &self,
        insert_usage_record_entity: InsertUsageRecordEntity,
        guard: Option<UsageGuard>,
    ) -> Result<StartCallOutcome>;

    async fn find_by_call_id(&self, call_id: String) -> Result<Option<UsageRecordEntity>>;

    /// Conditional status flip guarded by the expected current status;
    /// returns affected rows (0 when a concurrent writer got there first).
    async fn set_connected(&self, call_id: String, expected: CallStatus) -> Result<usize>;

    /// Closes the record once: end time, duration and terminal status, also
    /// guarded by the expected current status.
    async fn close_call(
        &self,
        call_id: String,
        expected: CallStatus,
        end_time: DateTime<Utc>,
        duration_sec: i32,
        status: CallStatus,
    ) -> Result<usize>;

    async fn totals_for_subscription(&self, subscription_id: i64) -> Result<UsageTotals>;

    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: UsageFilter,
    ) -> Result<Vec<UsageRecordEntity>>;

    async fn list(&self, filter: UsageFilter) -> Result<Vec<UsageRecordEntity>>;

    async fn list_in_period(
        &self,
        user_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Vec<UsageRecordEntity>>;

    async fn active_calls(&self) -> Result<Vec<UsageRecordEntity>>;
}
