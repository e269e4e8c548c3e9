use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use uuid::Uuid;

use crate::{
    domain::{
        entities::invoices::{InsertInvoiceEntity, InvoiceEntity},
        repositories::invoices::InvoiceRepository,
        value_objects::{enums::invoice_statuses::InvoiceStatus, invoices::InvoiceFilter},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{invoices, plans},
    },
};

pub struct InvoicePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl InvoicePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl InvoiceRepository for InvoicePostgres {
    async fn create(&self, insert_invoice_entity: InsertInvoiceEntity) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let invoice_id = insert_into(invoices::table)
            .values(&insert_invoice_entity)
            .returning(invoices::id)
            .get_result::<i64>(&mut conn)?;

        Ok(invoice_id)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<(InvoiceEntity, String)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = invoices::table
            .inner_join(plans::table)
            .filter(invoices::user_id.eq(user_id))
            .order(invoices::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select((InvoiceEntity::as_select(), plans::name))
            .load::<(InvoiceEntity, String)>(&mut conn)?;

        Ok(results)
    }

    async fn list(&self, filter: InvoiceFilter) -> Result<Vec<(InvoiceEntity, String)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = invoices::table
            .inner_join(plans::table)
            .select((InvoiceEntity::as_select(), plans::name))
            .into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(invoices::status.eq(status.to_string()));
        }
        if let Some(start_date) = filter.start_date {
            query = query.filter(invoices::created_at.ge(start_date));
        }
        if let Some(end_date) = filter.end_date {
            query = query.filter(invoices::created_at.le(end_date));
        }

        query = query.order(invoices::created_at.desc()).offset(filter.offset);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let results = query.load::<(InvoiceEntity, String)>(&mut conn)?;

        Ok(results)
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(invoices::table)
            .filter(invoices::status.eq(InvoiceStatus::Pending.to_string()))
            .filter(invoices::due_at.lt(now))
            .set(invoices::status.eq(InvoiceStatus::Overdue.to_string()))
            .execute(&mut conn)?;

        Ok(affected)
    }
}
