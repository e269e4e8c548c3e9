use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};

use crate::{
    application::usecases::errors::{UseCaseError, UseCaseResult},
    domain::{
        repositories::plans::PlanRepository,
        value_objects::{
            iam::Actor,
            plans::{
                CreatePlanModel, PlanModel, PlanWithStatsModel, PopularPlanModel, UpdatePlanModel,
            },
        },
    },
};

pub struct PlanCatalogUseCase<P>
where
    P: PlanRepository + 'static,
{
    plan_repo: Arc<P>,
}

impl<P> PlanCatalogUseCase<P>
where
    P: PlanRepository + 'static,
{
    pub fn new(plan_repo: Arc<P>) -> Self {
        Self { plan_repo }
    }

    /// Plans currently open for purchase.
    pub async fn list_active_plans(&self) -> UseCaseResult<Vec<PlanModel>> {
        let plans = self
            .plan_repo
            .list_active()
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(plans.into_iter().map(PlanModel::from).collect())
    }

    pub async fn get_plan(&self, plan_id: i64) -> UseCaseResult<PlanModel> {
        let plan = self
            .plan_repo
            .find_by_id(plan_id)
            .await
            .map_err(UseCaseError::Internal)?
            .ok_or(UseCaseError::NotFound("plan"))?;
        Ok(PlanModel::from(plan))
    }

    pub async fn create_plan(
        &self,
        actor: Actor,
        create_plan_model: CreatePlanModel,
    ) -> UseCaseResult<PlanModel> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let plan_id = self
            .plan_repo
            .create(create_plan_model.to_entity())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "plans: create failed");
                UseCaseError::Internal(err)
            })?;
        info!(plan_id, name = %create_plan_model.name, "plans: plan created");
        self.get_plan(plan_id).await
    }

    pub async fn update_plan(
        &self,
        actor: Actor,
        plan_id: i64,
        update_plan_model: UpdatePlanModel,
    ) -> UseCaseResult<PlanModel> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let touched = self
            .plan_repo
            .update(plan_id, update_plan_model.to_entity())
            .await
            .map_err(UseCaseError::Internal)?;
        if touched == 0 {
            return Err(UseCaseError::NotFound("plan"));
        }
        info!(plan_id, "plans: plan updated");
        self.get_plan(plan_id).await
    }

    /// Deactivation only blocks new subscriptions; running ones keep their
    /// plan until they lapse.
    pub async fn set_plan_active(
        &self,
        actor: Actor,
        plan_id: i64,
        active: bool,
    ) -> UseCaseResult<PlanModel> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let touched = self
            .plan_repo
            .set_active(plan_id, active)
            .await
            .map_err(UseCaseError::Internal)?;
        if touched == 0 {
            return Err(UseCaseError::NotFound("plan"));
        }
        info!(plan_id, active, "plans: plan active flag set");
        self.get_plan(plan_id).await
    }

    pub async fn list_plans_with_stats(
        &self,
        actor: Actor,
    ) -> UseCaseResult<Vec<PlanWithStatsModel>> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let now = Utc::now();
        let plans = self
            .plan_repo
            .list_all()
            .await
            .map_err(UseCaseError::Internal)?;

        let mut result = Vec::with_capacity(plans.len());
        for plan in plans {
            let stats = self
                .plan_repo
                .stats(plan.id, now)
                .await
                .map_err(UseCaseError::Internal)?;
            result.push(PlanWithStatsModel {
                plan: PlanModel::from(plan),
                stats,
            });
        }
        Ok(result)
    }

    pub async fn popular_plans(&self, limit: i64) -> UseCaseResult<Vec<PopularPlanModel>> {
        let ranked = self
            .plan_repo
            .popular(Utc::now(), limit)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(ranked
            .into_iter()
            .map(|(plan, active_subscriptions)| PopularPlanModel {
                plan: PlanModel::from(plan),
                active_subscriptions,
            })
            .collect())
    }
}
