use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use serde::Deserialize;

use crate::{
    application::usecases::plan_catalog::PlanCatalogUseCase,
    domain::{
        repositories::plans::PlanRepository,
        value_objects::{
            iam::Actor,
            plans::{CreatePlanModel, UpdatePlanModel},
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad, repositories::plans::PlanPostgres,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let plan_catalog_usecase = PlanCatalogUseCase::new(Arc::new(plan_repository));

    Router::new()
        .route("/", get(list_active_plans))
        .route("/", post(create_plan))
        .route("/popular", get(popular_plans))
        .route("/stats", get(list_plans_with_stats))
        .route("/:plan_id", get(get_plan))
        .route("/:plan_id", patch(update_plan))
        .route("/:plan_id/active", put(set_plan_active))
        .with_state(Arc::new(plan_catalog_usecase))
}

pub async fn list_active_plans<T>(
    State(plan_catalog_usecase): State<Arc<PlanCatalogUseCase<T>>>,
) -> impl IntoResponse
where
    T: PlanRepository + Send + Sync + 'static,
{
    match plan_catalog_usecase.list_active_plans().await {
        Ok(plans) => (StatusCode::OK, Json(plans)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_popular_limit")]
    pub limit: i64,
}

fn default_popular_limit() -> i64 {
    5
}

pub async fn popular_plans<T>(
    State(plan_catalog_usecase): State<Arc<PlanCatalogUseCase<T>>>,
    Query(query): Query<PopularQuery>,
) -> impl IntoResponse
where
    T: PlanRepository + Send + Sync + 'static,
{
    match plan_catalog_usecase.popular_plans(query.limit).await {
        Ok(plans) => (StatusCode::OK, Json(plans)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_plan<T>(
    State(plan_catalog_usecase): State<Arc<PlanCatalogUseCase<T>>>,
    Path(plan_id): Path<i64>,
) -> impl IntoResponse
where
    T: PlanRepository + Send + Sync + 'static,
{
    match plan_catalog_usecase.get_plan(plan_id).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_plans_with_stats<T>(
    State(plan_catalog_usecase): State<Arc<PlanCatalogUseCase<T>>>,
    actor: Actor,
) -> impl IntoResponse
where
    T: PlanRepository + Send + Sync + 'static,
{
    match plan_catalog_usecase.list_plans_with_stats(actor).await {
        Ok(plans) => (StatusCode::OK, Json(plans)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn create_plan<T>(
    State(plan_catalog_usecase): State<Arc<PlanCatalogUseCase<T>>>,
    actor: Actor,
    Json(create_plan_model): Json<CreatePlanModel>,
) -> impl IntoResponse
where
    T: PlanRepository + Send + Sync + 'static,
{
    match plan_catalog_usecase
        .create_plan(actor, create_plan_model)
        .await
    {
        Ok(plan) => (StatusCode::CREATED, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_plan<T>(
    State(plan_catalog_usecase): State<Arc<PlanCatalogUseCase<T>>>,
    actor: Actor,
    Path(plan_id): Path<i64>,
    Json(update_plan_model): Json<UpdatePlanModel>,
) -> impl IntoResponse
where
    T: PlanRepository + Send + Sync + 'static,
{
    match plan_catalog_usecase
        .update_plan(actor, plan_id, update_plan_model)
        .await
    {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct SetActiveBody {
    pub active: bool,
}

pub async fn set_plan_active<T>(
    State(plan_catalog_usecase): State<Arc<PlanCatalogUseCase<T>>>,
    actor: Actor,
    Path(plan_id): Path<i64>,
    Json(body): Json<SetActiveBody>,
) -> impl IntoResponse
where
    T: PlanRepository + Send + Sync + 'static,
{
    match plan_catalog_usecase
        .set_plan_active(actor, plan_id, body.active)
        .await
    {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(e) => e.into_response(),
    }
}
