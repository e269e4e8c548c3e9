pub mod call_directions;
pub mod call_statuses;
pub mod invoice_statuses;
pub mod payment_statuses;
