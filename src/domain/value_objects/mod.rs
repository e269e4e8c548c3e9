pub mod dashboards;
pub mod enums;
pub mod iam;
pub mod invoices;
pub mod plans;
pub mod subscriptions;
pub mod usage;
