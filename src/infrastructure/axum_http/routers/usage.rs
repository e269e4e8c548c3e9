use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    application::usecases::usage_ledger::UsageLedgerUseCase,
    domain::{
        repositories::{
            plans::PlanRepository, subscriptions::SubscriptionRepository, usage::UsageRepository,
        },
        value_objects::{
            iam::Actor,
            usage::{EndCallModel, StartCallModel, UsageFilter},
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        repositories::{
            plans::PlanPostgres, subscriptions::SubscriptionPostgres, usage::UsagePostgres,
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let usage_repository = UsagePostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let usage_ledger_usecase = UsageLedgerUseCase::new(
        Arc::new(usage_repository),
        Arc::new(subscription_repository),
        Arc::new(plan_repository),
    );

    Router::new()
        .route("/calls", post(record_call_start))
        .route("/calls/active", get(active_calls))
        .route("/calls/:call_id/connected", post(mark_connected))
        .route("/calls/:call_id/end", post(record_call_end))
        .route("/", get(list_usage))
        .route("/me", get(my_usage))
        .route("/monthly/:user_id/:year/:month", get(monthly_usage))
        .route(
            "/subscriptions/:subscription_id/percentage",
            get(usage_percentage),
        )
        .with_state(Arc::new(usage_ledger_usecase))
}

pub async fn record_call_start<U, S, P>(
    State(usecase): State<Arc<UsageLedgerUseCase<U, S, P>>>,
    actor: Actor,
    Json(start_call_model): Json<StartCallModel>,
) -> impl IntoResponse
where
    U: UsageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match usecase.record_call_start(actor, start_call_model).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn mark_connected<U, S, P>(
    State(usecase): State<Arc<UsageLedgerUseCase<U, S, P>>>,
    _actor: Actor,
    Path(call_id): Path<String>,
) -> impl IntoResponse
where
    U: UsageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match usecase.mark_connected(&call_id).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn record_call_end<U, S, P>(
    State(usecase): State<Arc<UsageLedgerUseCase<U, S, P>>>,
    _actor: Actor,
    Path(call_id): Path<String>,
    Json(end_call_model): Json<EndCallModel>,
) -> impl IntoResponse
where
    U: UsageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match usecase.record_call_end(&call_id, end_call_model).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn my_usage<U, S, P>(
    State(usecase): State<Arc<UsageLedgerUseCase<U, S, P>>>,
    actor: Actor,
    Query(filter): Query<UsageFilter>,
) -> impl IntoResponse
where
    U: UsageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match usecase.my_usage(actor.user_id, filter).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_usage<U, S, P>(
    State(usecase): State<Arc<UsageLedgerUseCase<U, S, P>>>,
    actor: Actor,
    Query(filter): Query<UsageFilter>,
) -> impl IntoResponse
where
    U: UsageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match usecase.list_usage(actor, filter).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn monthly_usage<U, S, P>(
    State(usecase): State<Arc<UsageLedgerUseCase<U, S, P>>>,
    actor: Actor,
    Path((user_id, year, month)): Path<(Uuid, i32, u32)>,
) -> impl IntoResponse
where
    U: UsageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match usecase.monthly_usage(actor, user_id, year, month).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Serialize)]
pub struct UsagePercentageResponse {
    pub subscription_id: i64,
    pub usage_percentage: f64,
}

pub async fn usage_percentage<U, S, P>(
    State(usecase): State<Arc<UsageLedgerUseCase<U, S, P>>>,
    actor: Actor,
    Path(subscription_id): Path<i64>,
) -> impl IntoResponse
where
    U: UsageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match usecase.usage_percentage(actor, subscription_id).await {
        Ok(percentage) => (
            StatusCode::OK,
            Json(UsagePercentageResponse {
                subscription_id,
                usage_percentage: percentage,
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn active_calls<U, S, P>(
    State(usecase): State<Arc<UsageLedgerUseCase<U, S, P>>>,
    actor: Actor,
) -> impl IntoResponse
where
    U: UsageRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    match usecase.active_calls(actor).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => e.into_response(),
    }
}
