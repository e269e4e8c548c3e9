use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    entities::plans::{EditPlanEntity, InsertPlanEntity, PlanEntity},
    value_objects::plans::PlanStats,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn list_active(&self) -> Result<Vec<PlanEntity>>;
    async fn list_all(&self) -> Result<Vec<PlanEntity>>;
    async fn find_by_id(&self, plan_id: i64) -> Result<Option<PlanEntity>>;
    async fn create(&self, insert_plan_entity: InsertPlanEntity) -> Result<i64>;
    async fn update(&self, plan_id: i64, edit_plan_entity: EditPlanEntity) -> Result<usize>;
    async fn set_active(&self, plan_id: i64, active: bool) -> Result<usize>;
    async fn stats(&self, plan_id: i64, now: DateTime<Utc>) -> Result<PlanStats>;
    async fn popular(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<(PlanEntity, i64)>>;
}
