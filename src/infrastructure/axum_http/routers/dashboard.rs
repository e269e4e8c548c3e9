use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::{
    application::usecases::dashboard::DashboardUseCase,
    domain::{
        repositories::{
            plans::PlanRepository, subscriptions::SubscriptionRepository, usage::UsageRepository,
        },
        value_objects::iam::Actor,
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        repositories::{
            plans::PlanPostgres, subscriptions::SubscriptionPostgres, usage::UsagePostgres,
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let usage_repository = UsagePostgres::new(Arc::clone(&db_pool));
    let dashboard_usecase = DashboardUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(plan_repository),
        Arc::new(usage_repository),
    );

    Router::new()
        .route("/admin", get(admin_overview))
        .route("/me", get(my_dashboard))
        .route("/users/:user_id", get(user_dashboard))
        .with_state(Arc::new(dashboard_usecase))
}

pub async fn admin_overview<S, P, U>(
    State(dashboard_usecase): State<Arc<DashboardUseCase<S, P, U>>>,
    actor: Actor,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
{
    match dashboard_usecase.admin_overview(actor).await {
        Ok(overview) => (StatusCode::OK, Json(overview)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn my_dashboard<S, P, U>(
    State(dashboard_usecase): State<Arc<DashboardUseCase<S, P, U>>>,
    actor: Actor,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
{
    match dashboard_usecase.user_dashboard(actor, actor.user_id).await {
        Ok(dashboard) => (StatusCode::OK, Json(dashboard)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn user_dashboard<S, P, U>(
    State(dashboard_usecase): State<Arc<DashboardUseCase<S, P, U>>>,
    actor: Actor,
    Path(user_id): Path<Uuid>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    U: UsageRepository + Send + Sync + 'static,
{
    match dashboard_usecase.user_dashboard(actor, user_id).await {
        Ok(dashboard) => (StatusCode::OK, Json(dashboard)).into_response(),
        Err(e) => e.into_response(),
    }
}
