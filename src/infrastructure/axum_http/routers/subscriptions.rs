use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    application::usecases::subscription_lifecycle::SubscriptionLifecycleUseCase,
    domain::{
        repositories::{
            invoices::InvoiceRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::{
            iam::Actor,
            subscriptions::{PaymentModel, SubscribeModel, SubscriptionFilter},
        },
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        repositories::{
            invoices::InvoicePostgres, plans::PlanPostgres, subscriptions::SubscriptionPostgres,
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let invoice_repository = InvoicePostgres::new(Arc::clone(&db_pool));
    let subscription_lifecycle_usecase = SubscriptionLifecycleUseCase::new(
        Arc::new(subscription_repository),
        Arc::new(plan_repository),
        Arc::new(invoice_repository),
    );

    Router::new()
        .route("/", post(subscribe))
        .route("/", get(list_subscriptions))
        .route("/me", get(my_subscriptions))
        .route("/me/active", get(active_subscription))
        .route("/expiring", get(expiring_subscriptions))
        .route("/analytics", get(subscription_analytics))
        .route("/revenue", get(revenue_stats))
        .route("/:subscription_id/renew", post(renew))
        .route("/:subscription_id/cancel", post(cancel))
        .with_state(Arc::new(subscription_lifecycle_usecase))
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_page_limit")]
    pub limit: i64,
}

fn default_page_limit() -> i64 {
    20
}

pub async fn subscribe<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
    Json(subscribe_model): Json<SubscribeModel>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase.subscribe(actor, subscribe_model).await {
        Ok(subscription) => (StatusCode::CREATED, Json(subscription)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn renew<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
    Path(subscription_id): Path<i64>,
    Json(payment): Json<PaymentModel>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase.renew(actor, subscription_id, payment).await {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn cancel<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
    Path(subscription_id): Path<i64>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase.cancel(actor, subscription_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn active_subscription<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase.active_subscription(actor.user_id).await {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn my_subscriptions<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
    Query(pagination): Query<Pagination>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase
        .my_subscriptions(actor.user_id, pagination.offset, pagination.limit)
        .await
    {
        Ok(subscriptions) => (StatusCode::OK, Json(subscriptions)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_subscriptions<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
    Query(filter): Query<SubscriptionFilter>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase.list_subscriptions(actor, filter).await {
        Ok(subscriptions) => (StatusCode::OK, Json(subscriptions)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    #[serde(default = "default_days_ahead")]
    pub days_ahead: i64,
    #[serde(default = "default_page_limit")]
    pub limit: i64,
}

fn default_days_ahead() -> i64 {
    7
}

pub async fn expiring_subscriptions<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
    Query(query): Query<ExpiringQuery>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase
        .expiring_subscriptions(actor, query.days_ahead, query.limit)
        .await
    {
        Ok(subscriptions) => (StatusCode::OK, Json(subscriptions)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn subscription_analytics<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase.subscription_analytics(actor).await {
        Ok(analytics) => (StatusCode::OK, Json(analytics)).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct RevenueQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

pub async fn revenue_stats<S, P, Inv>(
    State(usecase): State<Arc<SubscriptionLifecycleUseCase<S, P, Inv>>>,
    actor: Actor,
    Query(query): Query<RevenueQuery>,
) -> impl IntoResponse
where
    S: SubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match usecase
        .revenue_stats(actor, query.start_date, query.end_date)
        .await
    {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => e.into_response(),
    }
}
