use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
    value_objects::subscriptions::{
        PaymentModel, PlanRevenueRow, SubscriptionCounts, SubscriptionFilter,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Inserts the subscription unless the user already holds an active,
    /// unexpired one. The check and the insert run in a single transaction
    /// with the user's rows locked; `None` signals the conflict.
    async fn subscribe_exclusive(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;

    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<SubscriptionEntity>>;

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Extends an active subscription by `duration_days` from the later of
    /// (now, current end) and records the payment. `None` when the row is
    /// missing or no longer active.
    async fn renew_active(
        &self,
        subscription_id: i64,
        duration_days: i32,
        payment: PaymentModel,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>>;

    /// Sets `is_active = false` without touching `ends_at`. Idempotent.
    async fn cancel(&self, subscription_id: i64, now: DateTime<Utc>) -> Result<usize>;

    async fn list_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<SubscriptionEntity>>;

    async fn list(
        &self,
        filter: SubscriptionFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>>;

    async fn expiring_within(
        &self,
        now: DateTime<Utc>,
        days_ahead: i64,
        limit: i64,
    ) -> Result<Vec<SubscriptionEntity>>;

    async fn counts(&self, now: DateTime<Utc>) -> Result<SubscriptionCounts>;

    async fn revenue_rows(
        &self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<PlanRevenueRow>>;
}
