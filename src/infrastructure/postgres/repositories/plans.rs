use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{
    OptionalExtension, RunQueryDsl,
    dsl::{count_star, sum},
    insert_into,
    prelude::*,
    update,
};

use crate::{
    domain::{
        entities::plans::{EditPlanEntity, InsertPlanEntity, PlanEntity},
        repositories::plans::PlanRepository,
        value_objects::plans::PlanStats,
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{plans, subscriptions},
    },
};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    async fn list_active(&self) -> Result<Vec<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = plans::table
            .filter(plans::is_active.eq(true))
            .select(PlanEntity::as_select())
            .order(plans::price_minor.asc())
            .load::<PlanEntity>(&mut conn)?;

        Ok(results)
    }

    async fn list_all(&self) -> Result<Vec<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = plans::table
            .select(PlanEntity::as_select())
            .order(plans::id.asc())
            .load::<PlanEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_by_id(&self, plan_id: i64) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = plans::table
            .find(plan_id)
            .select(PlanEntity::as_select())
            .first::<PlanEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn create(&self, insert_plan_entity: InsertPlanEntity) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let plan_id = insert_into(plans::table)
            .values(&insert_plan_entity)
            .returning(plans::id)
            .get_result::<i64>(&mut conn)?;

        Ok(plan_id)
    }

    async fn update(&self, plan_id: i64, edit_plan_entity: EditPlanEntity) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(plans::table.find(plan_id))
            .set(&edit_plan_entity)
            .execute(&mut conn)?;

        Ok(affected)
    }

    async fn set_active(&self, plan_id: i64, active: bool) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(plans::table.find(plan_id))
            .set((plans::is_active.eq(active), plans::updated_at.eq(Utc::now())))
            .execute(&mut conn)?;

        Ok(affected)
    }

    async fn stats(&self, plan_id: i64, now: DateTime<Utc>) -> Result<PlanStats> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total_subscriptions = subscriptions::table
            .filter(subscriptions::plan_id.eq(plan_id))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        let active_subscriptions = subscriptions::table
            .filter(subscriptions::plan_id.eq(plan_id))
            .filter(subscriptions::is_active.eq(true))
            .filter(subscriptions::ends_at.ge(now))
            .select(count_star())
            .first::<i64>(&mut conn)?;

        let revenue_minor = subscriptions::table
            .filter(subscriptions::plan_id.eq(plan_id))
            .select(sum(subscriptions::payment_amount_minor))
            .first::<Option<i64>>(&mut conn)?
            .unwrap_or(0);

        Ok(PlanStats {
            total_subscriptions,
            active_subscriptions,
            revenue_minor,
        })
    }

    async fn popular(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<(PlanEntity, i64)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = plans::table
            .inner_join(subscriptions::table)
            .filter(subscriptions::is_active.eq(true))
            .filter(subscriptions::ends_at.ge(now))
            .group_by(plans::id)
            .select((PlanEntity::as_select(), count_star()))
            .order(count_star().desc())
            .limit(limit)
            .load::<(PlanEntity, i64)>(&mut conn)?;

        Ok(results)
    }
}
