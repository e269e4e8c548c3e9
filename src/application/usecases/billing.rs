use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::{
    application::usecases::errors::{UseCaseError, UseCaseResult},
    domain::{
        repositories::invoices::InvoiceRepository,
        value_objects::{
            iam::Actor,
            invoices::{InvoiceFilter, InvoiceModel},
        },
    },
};

pub struct BillingUseCase<Inv>
where
    Inv: InvoiceRepository + 'static,
{
    invoice_repo: Arc<Inv>,
}

impl<Inv> BillingUseCase<Inv>
where
    Inv: InvoiceRepository + 'static,
{
    pub fn new(invoice_repo: Arc<Inv>) -> Self {
        Self { invoice_repo }
    }

    pub async fn my_invoices(
        &self,
        actor: Actor,
        offset: i64,
        limit: i64,
    ) -> UseCaseResult<Vec<InvoiceModel>> {
        let invoices = self
            .invoice_repo
            .list_by_user(actor.user_id, offset, limit)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(invoices
            .into_iter()
            .map(|(entity, plan_name)| InvoiceModel::from_entity(entity, plan_name))
            .collect())
    }

    /// Admin listing. Pending invoices past due are flipped to overdue
    /// before the query runs, so the listing never shows a stale status.
    pub async fn list_invoices(
        &self,
        actor: Actor,
        filter: InvoiceFilter,
    ) -> UseCaseResult<Vec<InvoiceModel>> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let flipped = self
            .invoice_repo
            .mark_overdue(Utc::now())
            .await
            .map_err(UseCaseError::Internal)?;
        if flipped > 0 {
            info!(flipped, "billing: pending invoices marked overdue");
        }
        let invoices = self
            .invoice_repo
            .list(filter)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(invoices
            .into_iter()
            .map(|(entity, plan_name)| InvoiceModel::from_entity(entity, plan_name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::invoices::InvoiceEntity, repositories::invoices::MockInvoiceRepository,
        value_objects::enums::invoice_statuses::InvoiceStatus,
    };
    use uuid::Uuid;

    fn invoice(user_id: Uuid, status: InvoiceStatus) -> InvoiceEntity {
        let now = Utc::now();
        InvoiceEntity {
            id: 1,
            user_id,
            subscription_id: 1,
            plan_id: 1,
            amount_minor: 1_000,
            status: status.to_string(),
            period_start: now,
            period_end: now + chrono::Duration::days(30),
            due_at: now,
            paid_at: Some(now),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn admin_listing_marks_overdue_first() {
        let user_id = Uuid::new_v4();
        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_mark_overdue().times(1).returning(|_| Ok(2));
        invoices.expect_list().times(1).returning(move |_| {
            Ok(vec![(
                invoice(user_id, InvoiceStatus::Overdue),
                "Pro".to_string(),
            )])
        });

        let usecase = BillingUseCase::new(Arc::new(invoices));
        let listed = usecase
            .list_invoices(Actor::admin(Uuid::new_v4()), InvoiceFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].plan_name, "Pro");
    }

    #[tokio::test]
    async fn non_admin_cannot_list_all_invoices() {
        let usecase = BillingUseCase::new(Arc::new(MockInvoiceRepository::new()));
        let err = usecase
            .list_invoices(Actor::user(Uuid::new_v4()), InvoiceFilter::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Forbidden));
    }
}
