use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::usecases::billing::BillingUseCase,
    domain::{
        repositories::invoices::InvoiceRepository,
        value_objects::{iam::Actor, invoices::InvoiceFilter},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad, repositories::invoices::InvoicePostgres,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let invoice_repository = InvoicePostgres::new(Arc::clone(&db_pool));
    let billing_usecase = BillingUseCase::new(Arc::new(invoice_repository));

    Router::new()
        .route("/invoices", get(list_invoices))
        .route("/invoices/me", get(my_invoices))
        .with_state(Arc::new(billing_usecase))
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

pub async fn my_invoices<Inv>(
    State(billing_usecase): State<Arc<BillingUseCase<Inv>>>,
    actor: Actor,
    Query(pagination): Query<Pagination>,
) -> impl IntoResponse
where
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match billing_usecase
        .my_invoices(actor, pagination.offset, pagination.limit)
        .await
    {
        Ok(invoices) => (StatusCode::OK, Json(invoices)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_invoices<Inv>(
    State(billing_usecase): State<Arc<BillingUseCase<Inv>>>,
    actor: Actor,
    Query(filter): Query<InvoiceFilter>,
) -> impl IntoResponse
where
    Inv: InvoiceRepository + Send + Sync + 'static,
{
    match billing_usecase.list_invoices(actor, filter).await {
        Ok(invoices) => (StatusCode::OK, Json(invoices)).into_response(),
        Err(e) => e.into_response(),
    }
}
