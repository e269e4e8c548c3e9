use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    entities::invoices::{InsertInvoiceEntity, InvoiceEntity},
    value_objects::invoices::InvoiceFilter,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn create(&self, insert_invoice_entity: InsertInvoiceEntity) -> Result<i64>;

    /// Invoices joined with the plan name they were billed for.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<(InvoiceEntity, String)>>;

    async fn list(&self, filter: InvoiceFilter) -> Result<Vec<(InvoiceEntity, String)>>;

    /// Flips pending invoices past their due date to overdue; returns the
    /// number of rows touched.
    async fn mark_overdue(&self, now: DateTime<Utc>) -> Result<usize>;
}
