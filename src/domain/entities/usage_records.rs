use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::usage_records;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = usage_records)]
pub struct UsageRecordEntity {
    pub id: i64,
    pub user_id: Uuid,
    pub subscription_id: Option<i64>,
    pub call_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_sec: Option<i32>,
    pub status: String,
    pub caller_number: String,
    pub destination_number: String,
    pub direction: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = usage_records)]
pub struct InsertUsageRecordEntity {
    pub user_id: Uuid,
    pub subscription_id: Option<i64>,
    pub call_id: String,
    pub start_time: DateTime<Utc>,
    pub status: String,
    pub caller_number: String,
    pub destination_number: String,
    pub direction: String,
}
