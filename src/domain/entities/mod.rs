pub mod invoices;
pub mod plans;
pub mod subscriptions;
pub mod usage_records;
