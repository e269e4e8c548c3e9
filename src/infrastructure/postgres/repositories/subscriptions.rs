use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::{Connection, OptionalExtension, RunQueryDsl, dsl::count_star, insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::subscriptions::{InsertSubscriptionEntity, SubscriptionEntity},
        repositories::subscriptions::SubscriptionRepository,
        value_objects::{
            dashboards::month_start,
            enums::payment_statuses::PaymentStatus,
            subscriptions::{
                renewal_period, PaymentModel, PlanRevenueRow, SubscriptionCounts,
                SubscriptionFilter,
            },
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{plans, subscriptions},
    },
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn subscribe_exclusive(
        &self,
        insert_subscription_entity: InsertSubscriptionEntity,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<Option<SubscriptionEntity>, diesel::result::Error, _>(
            |tx| {
                // Lapsed rows keep their flag until the next subscribe for
                // the user runs; flip them here so exactly one row per user
                // can carry is_active after the insert.
                update(
                    subscriptions::table
                        .filter(subscriptions::user_id.eq(insert_subscription_entity.user_id))
                        .filter(subscriptions::is_active.eq(true))
                        .filter(subscriptions::ends_at.lt(now)),
                )
                .set((
                    subscriptions::is_active.eq(false),
                    subscriptions::updated_at.eq(now),
                ))
                .execute(tx)?;

                // Lock the user's remaining active row so two concurrent
                // subscribes cannot both pass the exclusivity check.
                let existing: Option<i64> = subscriptions::table
                    .filter(subscriptions::user_id.eq(insert_subscription_entity.user_id))
                    .filter(subscriptions::is_active.eq(true))
                    .select(subscriptions::id)
                    .for_update()
                    .first::<i64>(tx)
                    .optional()?;

                if existing.is_some() {
                    return Ok(None);
                }

                let inserted = insert_into(subscriptions::table)
                    .values(&insert_subscription_entity)
                    .returning(SubscriptionEntity::as_returning())
                    .get_result::<SubscriptionEntity>(tx)?;

                Ok(Some(inserted))
            },
        )?;

        Ok(result)
    }

    async fn find_by_id(&self, subscription_id: i64) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .find(subscription_id)
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_active_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .filter(subscriptions::is_active.eq(true))
            .filter(subscriptions::ends_at.ge(now))
            .order(subscriptions::ends_at.desc())
            .select(SubscriptionEntity::as_select())
            .first::<SubscriptionEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn renew_active(
        &self,
        subscription_id: i64,
        duration_days: i32,
        payment: PaymentModel,
        now: DateTime<Utc>,
    ) -> Result<Option<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<Option<SubscriptionEntity>, diesel::result::Error, _>(
            |tx| {
                // The row is locked so the new period is computed against an
                // end date no concurrent renewal can move underneath us.
                let current: Option<SubscriptionEntity> = subscriptions::table
                    .find(subscription_id)
                    .filter(subscriptions::is_active.eq(true))
                    .select(SubscriptionEntity::as_select())
                    .for_update()
                    .first::<SubscriptionEntity>(tx)
                    .optional()?;

                let Some(current) = current else {
                    return Ok(None);
                };

                let (starts_at, ends_at) = renewal_period(now, current.ends_at, duration_days);
                let renewed = update(subscriptions::table.find(subscription_id))
                    .set((
                        subscriptions::starts_at.eq(starts_at),
                        subscriptions::ends_at.eq(ends_at),
                        subscriptions::payment_status.eq(PaymentStatus::Completed.to_string()),
                        subscriptions::payment_amount_minor.eq(payment.amount_minor),
                        subscriptions::payment_method.eq(payment.method.clone()),
                        subscriptions::payment_ref.eq(payment.payment_ref.clone()),
                        subscriptions::updated_at.eq(now),
                    ))
                    .returning(SubscriptionEntity::as_returning())
                    .get_result::<SubscriptionEntity>(tx)?;

                Ok(Some(renewed))
            },
        )?;

        Ok(result)
    }

    async fn cancel(&self, subscription_id: i64, now: DateTime<Utc>) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(subscriptions::table.find(subscription_id))
            .set((
                subscriptions::is_active.eq(false),
                subscriptions::updated_at.eq(now),
            ))
            .execute(&mut conn)?;

        Ok(affected)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = subscriptions::table
            .filter(subscriptions::user_id.eq(user_id))
            .order(subscriptions::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list(
        &self,
        filter: SubscriptionFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = subscriptions::table
            .select(SubscriptionEntity::as_select())
            .into_boxed();

        if let Some(payment_status) = filter.payment_status {
            query = query.filter(subscriptions::payment_status.eq(payment_status.to_string()));
        }

        // "Active" is effective activity: the flag is set and the period has
        // not lapsed yet.
        match filter.is_active {
            Some(true) => {
                query = query
                    .filter(subscriptions::is_active.eq(true))
                    .filter(subscriptions::ends_at.ge(now));
            }
            Some(false) => {
                query = query.filter(
                    subscriptions::is_active
                        .eq(false)
                        .or(subscriptions::ends_at.lt(now)),
                );
            }
            None => {}
        }

        query = query
            .order(subscriptions::created_at.desc())
            .offset(filter.offset);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let results = query.load::<SubscriptionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn expiring_within(
        &self,
        now: DateTime<Utc>,
        days_ahead: i64,
        limit: i64,
    ) -> Result<Vec<SubscriptionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let horizon = now + Duration::days(days_ahead);

        let results = subscriptions::table
            .filter(subscriptions::is_active.eq(true))
            .filter(subscriptions::ends_at.ge(now))
            .filter(subscriptions::ends_at.le(horizon))
            .order(subscriptions::ends_at.asc())
            .limit(limit)
            .select(SubscriptionEntity::as_select())
            .load::<SubscriptionEntity>(&mut conn)?;

        Ok(results)
    }

    async fn counts(&self, now: DateTime<Utc>) -> Result<SubscriptionCounts> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = subscriptions::table
            .select(count_star())
            .first::<i64>(&mut conn)?;

        let active = subscriptions::table
            .filter(subscriptions::is_active.eq(true))
            .filter(subscriptions::ends_at.ge(now))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        let expired = subscriptions::table
            .filter(subscriptions::ends_at.lt(now))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        // Revenue counts settled money only; pending and failed payments
        // carry an amount but nothing was collected.
        let monthly_revenue_minor = subscriptions::table
            .filter(subscriptions::payment_status.eq(PaymentStatus::Completed.to_string()))
            .filter(subscriptions::created_at.ge(month_start(now)))
            .select(diesel::dsl::sum(subscriptions::payment_amount_minor))
            .first::<Option<i64>>(&mut conn)?
            .unwrap_or(0);

        let total_revenue_minor = subscriptions::table
            .filter(subscriptions::payment_status.eq(PaymentStatus::Completed.to_string()))
            .select(diesel::dsl::sum(subscriptions::payment_amount_minor))
            .first::<Option<i64>>(&mut conn)?
            .unwrap_or(0);

        Ok(SubscriptionCounts {
            total,
            active,
            expired,
            monthly_revenue_minor,
            total_revenue_minor,
        })
    }

    async fn revenue_rows(
        &self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> Result<Vec<PlanRevenueRow>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = subscriptions::table
            .inner_join(plans::table)
            .filter(subscriptions::payment_status.eq(PaymentStatus::Completed.to_string()))
            .select((plans::name, subscriptions::payment_amount_minor))
            .into_boxed();

        if let Some(start_date) = start_date {
            query = query.filter(subscriptions::created_at.ge(start_date));
        }
        if let Some(end_date) = end_date {
            query = query.filter(subscriptions::created_at.le(end_date));
        }

        let rows = query.load::<(String, i32)>(&mut conn)?;

        let mut by_plan: BTreeMap<String, (i64, i64)> = BTreeMap::new();
        for (plan_name, amount_minor) in rows {
            let entry = by_plan.entry(plan_name).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += i64::from(amount_minor);
        }

        Ok(by_plan
            .into_iter()
            .map(|(plan_name, (subscriptions, revenue_minor))| PlanRevenueRow {
                plan_name,
                subscriptions,
                revenue_minor,
            })
            .collect())
    }
}
