use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    Connection, OptionalExtension, RunQueryDsl,
    dsl::{count_star, sum},
    insert_into,
    prelude::*,
    update,
};
use uuid::Uuid;

use crate::{
    domain::{
        entities::usage_records::{InsertUsageRecordEntity, UsageRecordEntity},
        repositories::usage::{StartCallOutcome, UsageGuard, UsageRepository},
        value_objects::{
            enums::call_statuses::CallStatus,
            usage::{caps_exceeded, UsageFilter, UsageTotals},
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{subscriptions, usage_records},
    },
};

pub struct UsagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UsagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn totals_query(
    tx: &mut PgConnection,
    subscription_id: i64,
) -> Result<UsageTotals, diesel::result::Error> {
    let calls = usage_records::table
        .filter(usage_records::subscription_id.eq(subscription_id))
        .select(count_star())
        .first::<i64>(tx)?;

    let seconds = usage_records::table
        .filter(usage_records::subscription_id.eq(subscription_id))
        .select(sum(usage_records::duration_sec))
        .first::<Option<i64>>(tx)?
        .unwrap_or(0);

    Ok(UsageTotals { calls, seconds })
}

#[async_trait]
impl UsageRepository for UsagePostgres {
    async fn insert_guarded(
        &self,
        insert_usage_record_entity: InsertUsageRecordEntity,
        guard: Option<UsageGuard>,
    ) -> Result<StartCallOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<StartCallOutcome, diesel::result::Error, _>(|tx| {
            let duplicate: Option<i64> = usage_records::table
                .filter(usage_records::call_id.eq(&insert_usage_record_entity.call_id))
                .select(usage_records::id)
                .first::<i64>(tx)
                .optional()?;
            if duplicate.is_some() {
                return Ok(StartCallOutcome::DuplicateCallId);
            }

            if let Some(guard) = guard {
                // Lock the subscription row; concurrent call starts against
                // the same subscription serialize on it, so both cannot pass
                // the cap check with the same booked totals.
                subscriptions::table
                    .find(guard.subscription_id)
                    .select(subscriptions::id)
                    .for_update()
                    .first::<i64>(tx)?;

                let totals = totals_query(tx, guard.subscription_id)?;
                if caps_exceeded(totals, guard.max_calls, guard.max_minutes) {
                    return Ok(StartCallOutcome::LimitExceeded);
                }
            }

            let inserted = insert_into(usage_records::table)
                .values(&insert_usage_record_entity)
                .returning(UsageRecordEntity::as_returning())
                .get_result::<UsageRecordEntity>(tx)?;

            Ok(StartCallOutcome::Started(inserted))
        })?;

        Ok(outcome)
    }

    async fn find_by_call_id(&self, call_id: String) -> Result<Option<UsageRecordEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = usage_records::table
            .filter(usage_records::call_id.eq(call_id))
            .select(UsageRecordEntity::as_select())
            .first::<UsageRecordEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn set_connected(&self, call_id: String, expected: CallStatus) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(usage_records::table)
            .filter(usage_records::call_id.eq(call_id))
            .filter(usage_records::status.eq(expected.to_string()))
            .set((
                usage_records::status.eq(CallStatus::Connected.to_string()),
                usage_records::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(affected)
    }

    async fn close_call(
        &self,
        call_id: String,
        expected: CallStatus,
        end_time: DateTime<Utc>,
        duration_sec: i32,
        status: CallStatus,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(usage_records::table)
            .filter(usage_records::call_id.eq(call_id))
            .filter(usage_records::status.eq(expected.to_string()))
            .filter(usage_records::end_time.is_null())
            .set((
                usage_records::end_time.eq(Some(end_time)),
                usage_records::duration_sec.eq(Some(duration_sec)),
                usage_records::status.eq(status.to_string()),
                usage_records::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(affected)
    }

    async fn totals_for_subscription(&self, subscription_id: i64) -> Result<UsageTotals> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        Ok(totals_query(&mut conn, subscription_id)?)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        filter: UsageFilter,
    ) -> Result<Vec<UsageRecordEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = usage_records::table
            .filter(usage_records::user_id.eq(user_id))
            .select(UsageRecordEntity::as_select())
            .into_boxed();
        query = apply_filter(query, &filter);

        let results = query.load::<UsageRecordEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list(&self, filter: UsageFilter) -> Result<Vec<UsageRecordEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = usage_records::table
            .select(UsageRecordEntity::as_select())
            .into_boxed();
        query = apply_filter(query, &filter);

        let results = query.load::<UsageRecordEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_in_period(
        &self,
        user_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Result<Vec<UsageRecordEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = usage_records::table
            .filter(usage_records::user_id.eq(user_id))
            .filter(usage_records::start_time.ge(start_date))
            // half-open period: a record starting exactly on the boundary
            // belongs to the next period
            .filter(usage_records::start_time.lt(end_date))
            .order(usage_records::start_time.desc())
            .select(UsageRecordEntity::as_select())
            .load::<UsageRecordEntity>(&mut conn)?;

        Ok(results)
    }

    async fn active_calls(&self) -> Result<Vec<UsageRecordEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = usage_records::table
            .filter(usage_records::status.eq_any(vec![
                CallStatus::Initiated.to_string(),
                CallStatus::Connected.to_string(),
            ]))
            .order(usage_records::start_time.asc())
            .select(UsageRecordEntity::as_select())
            .load::<UsageRecordEntity>(&mut conn)?;

        Ok(results)
    }
}

type BoxedUsageQuery<'a> = diesel::dsl::IntoBoxed<
    'a,
    diesel::dsl::Select<usage_records::table, diesel::dsl::AsSelect<UsageRecordEntity, diesel::pg::Pg>>,
    diesel::pg::Pg,
>;

fn apply_filter<'a>(mut query: BoxedUsageQuery<'a>, filter: &UsageFilter) -> BoxedUsageQuery<'a> {
    if let Some(status) = filter.status {
        query = query.filter(usage_records::status.eq(status.to_string()));
    }
    if let Some(direction) = filter.direction {
        query = query.filter(usage_records::direction.eq(direction.to_string()));
    }
    if let Some(start_date) = filter.start_date {
        query = query.filter(usage_records::start_time.ge(start_date));
    }
    if let Some(end_date) = filter.end_date {
        query = query.filter(usage_records::start_time.lt(end_date));
    }

    query = query
        .order(usage_records::start_time.desc())
        .offset(filter.offset);
    if let Some(limit) = filter.limit {
        query = query.limit(limit);
    }
    query
}
