pub mod billing;
pub mod dashboard;
pub mod plans;
pub mod subscriptions;
pub mod usage;
