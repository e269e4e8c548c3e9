use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::invoices::InvoiceEntity,
    value_objects::enums::invoice_statuses::InvoiceStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceModel {
    pub id: i64,
    pub user_id: Uuid,
    pub subscription_id: i64,
    pub plan_id: i64,
    pub plan_name: String,
    pub amount_minor: i32,
    pub status: InvoiceStatus,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InvoiceModel {
    pub fn from_entity(entity: InvoiceEntity, plan_name: String) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            subscription_id: entity.subscription_id,
            plan_id: entity.plan_id,
            plan_name,
            amount_minor: entity.amount_minor,
            status: InvoiceStatus::from_str(&entity.status).unwrap_or_default(),
            period_start: entity.period_start,
            period_end: entity.period_end,
            due_at: entity.due_at,
            paid_at: entity.paid_at,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub offset: i64,
    pub limit: Option<i64>,
}
