use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::usecases::errors::{UseCaseError, UseCaseResult},
    domain::{
        entities::{invoices::InsertInvoiceEntity, subscriptions::InsertSubscriptionEntity},
        repositories::{
            invoices::InvoiceRepository, plans::PlanRepository,
            subscriptions::SubscriptionRepository,
        },
        value_objects::{
            enums::{invoice_statuses::InvoiceStatus, payment_statuses::PaymentStatus},
            iam::Actor,
            subscriptions::{
                initial_period, PaymentModel, RevenueStatsModel, SubscribeModel,
                SubscriptionAnalyticsModel, SubscriptionFilter, SubscriptionModel,
            },
        },
    },
};

pub struct SubscriptionLifecycleUseCase<S, P, Inv>
where
    S: SubscriptionRepository + 'static,
    P: PlanRepository + 'static,
    Inv: InvoiceRepository + 'static,
{
    subscription_repo: Arc<S>,
    plan_repo: Arc<P>,
    invoice_repo: Arc<Inv>,
}

impl<S, P, Inv> SubscriptionLifecycleUseCase<S, P, Inv>
where
    S: SubscriptionRepository + 'static,
    P: PlanRepository + 'static,
    Inv: InvoiceRepository + 'static,
{
    pub fn new(subscription_repo: Arc<S>, plan_repo: Arc<P>, invoice_repo: Arc<Inv>) -> Self {
        Self {
            subscription_repo,
            plan_repo,
            invoice_repo,
        }
    }

    /// Creates a subscription after a confirmed payment. At most one active
    /// subscription may exist per user; the repository enforces that
    /// transactionally and a duplicate surfaces as `Conflict`.
    pub async fn subscribe(
        &self,
        actor: Actor,
        subscribe_model: SubscribeModel,
    ) -> UseCaseResult<SubscriptionModel> {
        let user_id = subscribe_model.user_id;
        if !actor.can_act_for(user_id) {
            warn!(%user_id, actor_id = %actor.user_id, "subscriptions: subscribe for another user denied");
            return Err(UseCaseError::Forbidden);
        }

        let plan = self
            .plan_repo
            .find_by_id(subscribe_model.plan_id)
            .await
            .map_err(|err| {
                error!(plan_id = subscribe_model.plan_id, db_error = ?err, "subscriptions: failed to load plan");
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound("plan"))?;

        if !plan.is_active {
            warn!(plan_id = plan.id, "subscriptions: subscribe to inactive plan rejected");
            return Err(UseCaseError::PlanInactive);
        }

        let now = Utc::now();
        let (starts_at, ends_at) = initial_period(now, plan.duration_days);
        let insert = InsertSubscriptionEntity {
            user_id,
            plan_id: plan.id,
            starts_at,
            ends_at,
            is_active: true,
            payment_status: PaymentStatus::Completed.to_string(),
            payment_amount_minor: subscribe_model.payment.amount_minor,
            payment_method: subscribe_model.payment.method.clone(),
            payment_ref: subscribe_model.payment.payment_ref.clone(),
        };

        let subscription = self
            .subscription_repo
            .subscribe_exclusive(insert, now)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: subscribe insert failed");
                UseCaseError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, "subscriptions: user already has an active subscription");
                UseCaseError::Conflict("user already has an active subscription".to_string())
            })?;

        self.emit_paid_invoice(&subscription, plan.id, starts_at, ends_at, now)
            .await?;

        info!(
            %user_id,
            subscription_id = subscription.id,
            plan_id = plan.id,
            ends_at = %ends_at,
            "subscriptions: subscription created"
        );
        Ok(SubscriptionModel::from_entity(subscription, now))
    }

    /// Extends an active subscription by one plan period from the later of
    /// (now, current end). A cancelled or missing subscription renews as
    /// `NotFound`; cancellation is final and requires subscribing anew.
    pub async fn renew(
        &self,
        actor: Actor,
        subscription_id: i64,
        payment: PaymentModel,
    ) -> UseCaseResult<SubscriptionModel> {
        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(UseCaseError::Internal)?
            .ok_or(UseCaseError::NotFound("subscription"))?;

        if !actor.can_act_for(subscription.user_id) {
            return Err(UseCaseError::Forbidden);
        }
        if !subscription.is_active {
            warn!(subscription_id, "subscriptions: renew on cancelled subscription rejected");
            return Err(UseCaseError::NotFound("subscription"));
        }

        let plan = self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(UseCaseError::Internal)?
            .ok_or(UseCaseError::NotFound("plan"))?;

        let now = Utc::now();
        let renewed = self
            .subscription_repo
            .renew_active(subscription_id, plan.duration_days, payment, now)
            .await
            .map_err(|err| {
                error!(subscription_id, db_error = ?err, "subscriptions: renew failed");
                UseCaseError::Internal(err)
            })?
            .ok_or(UseCaseError::NotFound("subscription"))?;

        let period_end = renewed.ends_at;
        let period_start = period_end - Duration::days(i64::from(plan.duration_days));
        self.emit_paid_invoice(&renewed, plan.id, period_start, period_end, now)
            .await?;

        info!(
            subscription_id,
            ends_at = %renewed.ends_at,
            "subscriptions: subscription renewed"
        );
        Ok(SubscriptionModel::from_entity(renewed, now))
    }

    /// Deactivates the subscription without touching `ends_at`; history is
    /// preserved and repeating the call is a no-op.
    pub async fn cancel(&self, actor: Actor, subscription_id: i64) -> UseCaseResult<()> {
        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(UseCaseError::Internal)?
            .ok_or(UseCaseError::NotFound("subscription"))?;

        if !actor.can_act_for(subscription.user_id) {
            return Err(UseCaseError::Forbidden);
        }

        self.subscription_repo
            .cancel(subscription_id, Utc::now())
            .await
            .map_err(|err| {
                error!(subscription_id, db_error = ?err, "subscriptions: cancel failed");
                UseCaseError::Internal(err)
            })?;

        info!(subscription_id, "subscriptions: subscription cancelled");
        Ok(())
    }

    pub async fn active_subscription(
        &self,
        user_id: Uuid,
    ) -> UseCaseResult<Option<SubscriptionModel>> {
        let now = Utc::now();
        let subscription = self
            .subscription_repo
            .find_active_by_user(user_id, now)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(subscription.map(|entity| SubscriptionModel::from_entity(entity, now)))
    }

    pub async fn my_subscriptions(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> UseCaseResult<Vec<SubscriptionModel>> {
        let now = Utc::now();
        let subscriptions = self
            .subscription_repo
            .list_by_user(user_id, offset, limit)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(subscriptions
            .into_iter()
            .map(|entity| SubscriptionModel::from_entity(entity, now))
            .collect())
    }

    pub async fn list_subscriptions(
        &self,
        actor: Actor,
        filter: SubscriptionFilter,
    ) -> UseCaseResult<Vec<SubscriptionModel>> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let now = Utc::now();
        let subscriptions = self
            .subscription_repo
            .list(filter, now)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(subscriptions
            .into_iter()
            .map(|entity| SubscriptionModel::from_entity(entity, now))
            .collect())
    }

    pub async fn expiring_subscriptions(
        &self,
        actor: Actor,
        days_ahead: i64,
        limit: i64,
    ) -> UseCaseResult<Vec<SubscriptionModel>> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let now = Utc::now();
        let subscriptions = self
            .subscription_repo
            .expiring_within(now, days_ahead, limit)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(subscriptions
            .into_iter()
            .map(|entity| SubscriptionModel::from_entity(entity, now))
            .collect())
    }

    pub async fn subscription_analytics(
        &self,
        actor: Actor,
    ) -> UseCaseResult<SubscriptionAnalyticsModel> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let counts = self
            .subscription_repo
            .counts(Utc::now())
            .await
            .map_err(UseCaseError::Internal)?;
        let conversion_rate = if counts.total > 0 {
            counts.active as f64 / counts.total as f64 * 100.0
        } else {
            0.0
        };
        Ok(SubscriptionAnalyticsModel {
            total_subscriptions: counts.total,
            active_subscriptions: counts.active,
            expired_subscriptions: counts.expired,
            monthly_revenue_minor: counts.monthly_revenue_minor,
            total_revenue_minor: counts.total_revenue_minor,
            conversion_rate,
        })
    }

    pub async fn revenue_stats(
        &self,
        actor: Actor,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> UseCaseResult<RevenueStatsModel> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let rows = self
            .subscription_repo
            .revenue_rows(start_date, end_date)
            .await
            .map_err(UseCaseError::Internal)?;

        let total_revenue_minor: i64 = rows.iter().map(|row| row.revenue_minor).sum();
        let total_subscriptions: i64 = rows.iter().map(|row| row.subscriptions).sum();
        let average_revenue_minor = if total_subscriptions > 0 {
            total_revenue_minor / total_subscriptions
        } else {
            0
        };
        Ok(RevenueStatsModel {
            total_revenue_minor,
            total_subscriptions,
            average_revenue_minor,
            plan_breakdown: rows,
        })
    }

    async fn emit_paid_invoice(
        &self,
        subscription: &crate::domain::entities::subscriptions::SubscriptionEntity,
        plan_id: i64,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> UseCaseResult<i64> {
        self.invoice_repo
            .create(InsertInvoiceEntity {
                user_id: subscription.user_id,
                subscription_id: subscription.id,
                plan_id,
                amount_minor: subscription.payment_amount_minor,
                status: InvoiceStatus::Paid.to_string(),
                period_start,
                period_end,
                due_at: period_start,
                paid_at: Some(now),
            })
            .await
            .map_err(|err| {
                error!(
                    subscription_id = subscription.id,
                    db_error = ?err,
                    "subscriptions: failed to create invoice"
                );
                UseCaseError::Internal(err)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
        repositories::{
            invoices::MockInvoiceRepository, plans::MockPlanRepository,
            subscriptions::MockSubscriptionRepository,
        },
        value_objects::subscriptions::SubscriptionCounts,
    };
    use mockall::predicate::eq;

    fn plan(id: i64, duration_days: i32, is_active: bool) -> PlanEntity {
        let now = Utc::now();
        PlanEntity {
            id,
            name: "Pro".to_string(),
            description: None,
            price_minor: 49_900,
            duration_days,
            max_calls: 100,
            max_minutes: 500,
            features: serde_json::Value::Null,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    fn subscription(id: i64, user_id: Uuid, is_active: bool) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id,
            user_id,
            plan_id: 1,
            starts_at: now,
            ends_at: now + Duration::days(30),
            is_active,
            payment_status: "completed".to_string(),
            payment_amount_minor: 49_900,
            payment_method: Some("card".to_string()),
            payment_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment() -> PaymentModel {
        PaymentModel {
            amount_minor: 49_900,
            method: Some("card".to_string()),
            payment_ref: Some("pay_123".to_string()),
        }
    }

    fn usecase(
        subs: MockSubscriptionRepository,
        plans: MockPlanRepository,
        invoices: MockInvoiceRepository,
    ) -> SubscriptionLifecycleUseCase<
        MockSubscriptionRepository,
        MockPlanRepository,
        MockInvoiceRepository,
    > {
        SubscriptionLifecycleUseCase::new(Arc::new(subs), Arc::new(plans), Arc::new(invoices))
    }

    #[tokio::test]
    async fn subscribe_creates_subscription_and_paid_invoice() {
        let user_id = Uuid::new_v4();

        let mut plans = MockPlanRepository::new();
        plans
            .expect_find_by_id()
            .with(eq(1))
            .returning(|id| Ok(Some(plan(id, 30, true))));

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_subscribe_exclusive().returning(move |insert, now| {
            assert!(insert.is_active);
            assert_eq!(insert.payment_status, "completed");
            assert_eq!(insert.ends_at, insert.starts_at + Duration::days(30));
            let mut entity = subscription(7, insert.user_id, true);
            entity.starts_at = insert.starts_at;
            entity.ends_at = insert.ends_at;
            entity.created_at = now;
            Ok(Some(entity))
        });

        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_create().returning(|insert| {
            assert_eq!(insert.status, "paid");
            assert!(insert.paid_at.is_some());
            assert_eq!(insert.subscription_id, 7);
            Ok(1)
        });

        let usecase = usecase(subs, plans, invoices);
        let model = usecase
            .subscribe(
                Actor::user(user_id),
                SubscribeModel {
                    user_id,
                    plan_id: 1,
                    payment: payment(),
                },
            )
            .await
            .unwrap();

        assert!(model.is_active);
        assert_eq!(model.payment_status, PaymentStatus::Completed);
        assert_eq!(model.ends_at, model.starts_at + Duration::days(30));
    }

    #[tokio::test]
    async fn subscribe_conflicts_when_active_subscription_exists() {
        let user_id = Uuid::new_v4();

        let mut plans = MockPlanRepository::new();
        plans
            .expect_find_by_id()
            .returning(|id| Ok(Some(plan(id, 30, true))));

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_subscribe_exclusive().returning(|_, _| Ok(None));

        let invoices = MockInvoiceRepository::new();

        let usecase = usecase(subs, plans, invoices);
        let err = usecase
            .subscribe(
                Actor::user(user_id),
                SubscribeModel {
                    user_id,
                    plan_id: 1,
                    payment: payment(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn subscribe_rejects_inactive_plan() {
        let user_id = Uuid::new_v4();

        let mut plans = MockPlanRepository::new();
        plans
            .expect_find_by_id()
            .returning(|id| Ok(Some(plan(id, 30, false))));

        let usecase = usecase(
            MockSubscriptionRepository::new(),
            plans,
            MockInvoiceRepository::new(),
        );
        let err = usecase
            .subscribe(
                Actor::user(user_id),
                SubscribeModel {
                    user_id,
                    plan_id: 1,
                    payment: payment(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::PlanInactive));
    }

    #[tokio::test]
    async fn subscribe_for_another_user_requires_admin() {
        let actor = Actor::user(Uuid::new_v4());
        let other = Uuid::new_v4();

        let usecase = usecase(
            MockSubscriptionRepository::new(),
            MockPlanRepository::new(),
            MockInvoiceRepository::new(),
        );
        let err = usecase
            .subscribe(
                actor,
                SubscribeModel {
                    user_id: other,
                    plan_id: 1,
                    payment: payment(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Forbidden));
    }

    #[tokio::test]
    async fn renew_cancelled_subscription_is_not_found() {
        let user_id = Uuid::new_v4();
        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_by_id()
            .with(eq(5))
            .returning(move |id| Ok(Some(subscription(id, user_id, false))));

        let usecase = usecase(subs, MockPlanRepository::new(), MockInvoiceRepository::new());
        let err = usecase
            .renew(Actor::user(user_id), 5, payment())
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NotFound("subscription")));
    }

    #[tokio::test]
    async fn renew_missing_subscription_is_not_found() {
        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_by_id().returning(|_| Ok(None));

        let usecase = usecase(subs, MockPlanRepository::new(), MockInvoiceRepository::new());
        let err = usecase
            .renew(Actor::admin(Uuid::new_v4()), 42, payment())
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NotFound("subscription")));
    }

    #[tokio::test]
    async fn renew_emits_invoice_for_new_period() {
        let user_id = Uuid::new_v4();

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_by_id()
            .returning(move |id| Ok(Some(subscription(id, user_id, true))));
        subs.expect_renew_active().returning(move |id, days, _, now| {
            let mut entity = subscription(id, user_id, true);
            entity.ends_at = entity.ends_at.max(now) + Duration::days(i64::from(days));
            Ok(Some(entity))
        });

        let mut plans = MockPlanRepository::new();
        plans
            .expect_find_by_id()
            .returning(|id| Ok(Some(plan(id, 30, true))));

        let mut invoices = MockInvoiceRepository::new();
        invoices.expect_create().returning(|insert| {
            assert_eq!(insert.status, "paid");
            assert_eq!(
                insert.period_end,
                insert.period_start + Duration::days(30)
            );
            Ok(2)
        });

        let usecase = usecase(subs, plans, invoices);
        let before = usecase
            .renew(Actor::user(user_id), 9, payment())
            .await
            .unwrap();
        // the renewed end is a full period past the previous one
        assert!(before.ends_at > Utc::now() + Duration::days(30));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let user_id = Uuid::new_v4();
        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_by_id()
            .returning(move |id| Ok(Some(subscription(id, user_id, false))));
        // already cancelled: repository touches zero rows, still Ok
        subs.expect_cancel().returning(|_, _| Ok(0));

        let usecase = usecase(subs, MockPlanRepository::new(), MockInvoiceRepository::new());
        usecase.cancel(Actor::user(user_id), 3).await.unwrap();
    }

    #[tokio::test]
    async fn analytics_requires_admin_and_computes_conversion() {
        let mut subs = MockSubscriptionRepository::new();
        subs.expect_counts().returning(|_| {
            Ok(SubscriptionCounts {
                total: 200,
                active: 50,
                expired: 150,
                monthly_revenue_minor: 10_000,
                total_revenue_minor: 90_000,
            })
        });

        let usecase = usecase(subs, MockPlanRepository::new(), MockInvoiceRepository::new());
        let err = usecase
            .subscription_analytics(Actor::user(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Forbidden));

        let analytics = usecase
            .subscription_analytics(Actor::admin(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(analytics.active_subscriptions, 50);
        assert!((analytics.conversion_rate - 25.0).abs() < f64::EPSILON);
    }
}
