use std::sync::Arc;

use anyhow::anyhow;
use chrono::{TimeZone, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    application::usecases::errors::{UseCaseError, UseCaseResult},
    domain::{
        entities::usage_records::{InsertUsageRecordEntity, UsageRecordEntity},
        repositories::{
            plans::PlanRepository,
            subscriptions::SubscriptionRepository,
            usage::{StartCallOutcome, UsageGuard, UsageRepository},
        },
        value_objects::{
            enums::call_statuses::CallStatus,
            iam::Actor,
            usage::{
                usage_percentage, EndCallModel, MonthlyUsageModel, StartCallModel, UsageFilter,
                UsageRecordModel,
            },
        },
    },
};

pub struct UsageLedgerUseCase<U, S, P>
where
    U: UsageRepository + 'static,
    S: SubscriptionRepository + 'static,
    P: PlanRepository + 'static,
{
    usage_repo: Arc<U>,
    subscription_repo: Arc<S>,
    plan_repo: Arc<P>,
}

impl<U, S, P> UsageLedgerUseCase<U, S, P>
where
    U: UsageRepository + 'static,
    S: SubscriptionRepository + 'static,
    P: PlanRepository + 'static,
{
    pub fn new(usage_repo: Arc<U>, subscription_repo: Arc<S>, plan_repo: Arc<P>) -> Self {
        Self {
            usage_repo,
            subscription_repo,
            plan_repo,
        }
    }

    /// Books a starting call against the caller's active subscription. The
    /// plan caps are enforced inside the insert transaction; a user without
    /// an active subscription gets an unattached record, billed out-of-band.
    pub async fn record_call_start(
        &self,
        actor: Actor,
        start_call_model: StartCallModel,
    ) -> UseCaseResult<UsageRecordModel> {
        let user_id = start_call_model.user_id;
        if !actor.can_act_for(user_id) {
            return Err(UseCaseError::Forbidden);
        }

        let guard = match self
            .subscription_repo
            .find_active_by_user(user_id, Utc::now())
            .await
            .map_err(UseCaseError::Internal)?
        {
            Some(subscription) => {
                let plan = self
                    .plan_repo
                    .find_by_id(subscription.plan_id)
                    .await
                    .map_err(UseCaseError::Internal)?
                    .ok_or_else(|| {
                        UseCaseError::Internal(anyhow!(
                            "plan {} referenced by subscription {} is missing",
                            subscription.plan_id,
                            subscription.id
                        ))
                    })?;
                Some(UsageGuard {
                    subscription_id: subscription.id,
                    max_calls: plan.max_calls,
                    max_minutes: plan.max_minutes,
                })
            }
            None => None,
        };

        let insert = InsertUsageRecordEntity {
            user_id,
            subscription_id: guard.map(|g| g.subscription_id),
            call_id: start_call_model.call_id.clone(),
            start_time: start_call_model.start_time,
            status: CallStatus::Initiated.to_string(),
            caller_number: start_call_model.caller_number,
            destination_number: start_call_model.destination_number,
            direction: start_call_model.direction.to_string(),
        };

        match self
            .usage_repo
            .insert_guarded(insert, guard)
            .await
            .map_err(|err| {
                error!(%user_id, call_id = %start_call_model.call_id, db_error = ?err, "usage: call start insert failed");
                UseCaseError::Internal(err)
            })? {
            StartCallOutcome::Started(entity) => {
                info!(
                    %user_id,
                    call_id = %entity.call_id,
                    subscription_id = ?entity.subscription_id,
                    "usage: call started"
                );
                Ok(UsageRecordModel::from(entity))
            }
            StartCallOutcome::DuplicateCallId => {
                warn!(call_id = %start_call_model.call_id, "usage: duplicate call_id rejected");
                Err(UseCaseError::Conflict(
                    "usage record with this call_id already exists".to_string(),
                ))
            }
            StartCallOutcome::LimitExceeded => {
                warn!(%user_id, "usage: plan cap reached, call rejected");
                Err(UseCaseError::LimitExceeded)
            }
        }
    }

    /// Marks an initiated call as connected.
    pub async fn mark_connected(&self, call_id: &str) -> UseCaseResult<UsageRecordModel> {
        let record = self.open_record(call_id).await?;
        let current = Self::status_of(&record)?;
        if !current.can_transition_to(CallStatus::Connected) {
            return Err(UseCaseError::InvalidStateTransition {
                from: current,
                to: CallStatus::Connected,
            });
        }

        let touched = self
            .usage_repo
            .set_connected(call_id.to_string(), current)
            .await
            .map_err(UseCaseError::Internal)?;
        if touched == 0 {
            // a concurrent writer moved the record first
            return Err(UseCaseError::InvalidStateTransition {
                from: current,
                to: CallStatus::Connected,
            });
        }

        let entity = self.open_record(call_id).await?;
        Ok(UsageRecordModel::from(entity))
    }

    /// Closes an open call exactly once: end time, duration and a terminal
    /// status. Already-closed and unknown calls surface as `NotFound`.
    pub async fn record_call_end(
        &self,
        call_id: &str,
        end_call_model: EndCallModel,
    ) -> UseCaseResult<UsageRecordModel> {
        let record = self.open_record(call_id).await?;
        if record.end_time.is_some() {
            return Err(UseCaseError::NotFound("open usage record"));
        }

        let current = Self::status_of(&record)?;
        let next = end_call_model.status;
        if current.is_terminal() {
            return Err(UseCaseError::NotFound("open usage record"));
        }
        if !next.is_terminal() || !current.can_transition_to(next) {
            return Err(UseCaseError::InvalidStateTransition {
                from: current,
                to: next,
            });
        }

        let duration_sec = (end_call_model.end_time - record.start_time)
            .num_seconds()
            .max(0) as i32;

        let touched = self
            .usage_repo
            .close_call(
                call_id.to_string(),
                current,
                end_call_model.end_time,
                duration_sec,
                next,
            )
            .await
            .map_err(|err| {
                error!(call_id, db_error = ?err, "usage: call close failed");
                UseCaseError::Internal(err)
            })?;
        if touched == 0 {
            return Err(UseCaseError::NotFound("open usage record"));
        }

        info!(call_id, duration_sec, status = %next, "usage: call closed");
        let entity = self.open_record(call_id).await?;
        Ok(UsageRecordModel::from(entity))
    }

    /// Consumption of a subscription against its plan caps, as a percentage.
    /// Readable by the subscription's owner and admins only.
    pub async fn usage_percentage(&self, actor: Actor, subscription_id: i64) -> UseCaseResult<f64> {
        let subscription = self
            .subscription_repo
            .find_by_id(subscription_id)
            .await
            .map_err(UseCaseError::Internal)?
            .ok_or(UseCaseError::NotFound("subscription"))?;
        if !actor.can_act_for(subscription.user_id) {
            return Err(UseCaseError::Forbidden);
        }
        let plan = self
            .plan_repo
            .find_by_id(subscription.plan_id)
            .await
            .map_err(UseCaseError::Internal)?
            .ok_or(UseCaseError::NotFound("plan"))?;
        let totals = self
            .usage_repo
            .totals_for_subscription(subscription_id)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(usage_percentage(totals, plan.max_calls, plan.max_minutes))
    }

    pub async fn my_usage(
        &self,
        user_id: Uuid,
        filter: UsageFilter,
    ) -> UseCaseResult<Vec<UsageRecordModel>> {
        let records = self
            .usage_repo
            .list_by_user(user_id, filter)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(records.into_iter().map(UsageRecordModel::from).collect())
    }

    pub async fn list_usage(
        &self,
        actor: Actor,
        filter: UsageFilter,
    ) -> UseCaseResult<Vec<UsageRecordModel>> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let records = self
            .usage_repo
            .list(filter)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(records.into_iter().map(UsageRecordModel::from).collect())
    }

    pub async fn monthly_usage(
        &self,
        actor: Actor,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> UseCaseResult<MonthlyUsageModel> {
        if !actor.can_act_for(user_id) {
            return Err(UseCaseError::Forbidden);
        }
        let start = Utc
            .with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| UseCaseError::BadRequest(format!("invalid month: {year}-{month}")))?;
        let end = if month == 12 {
            Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
        } else {
            Utc.with_ymd_and_hms(year, month + 1, 1, 0, 0, 0)
        }
        .single()
        .ok_or_else(|| UseCaseError::BadRequest(format!("invalid month: {year}-{month}")))?;

        let records = self
            .usage_repo
            .list_in_period(user_id, start, end)
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(MonthlyUsageModel::aggregate(year, month, &records))
    }

    pub async fn active_calls(&self, actor: Actor) -> UseCaseResult<Vec<UsageRecordModel>> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let records = self
            .usage_repo
            .active_calls()
            .await
            .map_err(UseCaseError::Internal)?;
        Ok(records.into_iter().map(UsageRecordModel::from).collect())
    }

    async fn open_record(&self, call_id: &str) -> UseCaseResult<UsageRecordEntity> {
        self.usage_repo
            .find_by_call_id(call_id.to_string())
            .await
            .map_err(UseCaseError::Internal)?
            .ok_or(UseCaseError::NotFound("usage record"))
    }

    fn status_of(record: &UsageRecordEntity) -> UseCaseResult<CallStatus> {
        CallStatus::from_str(&record.status)
            .ok_or_else(|| UseCaseError::Internal(anyhow!("unknown call status: {}", record.status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::{plans::PlanEntity, subscriptions::SubscriptionEntity},
        repositories::{
            plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
            usage::MockUsageRepository,
        },
        value_objects::enums::call_directions::CallDirection,
    };
    use chrono::Duration;

    fn plan(max_calls: i32, max_minutes: i32) -> PlanEntity {
        let now = Utc::now();
        PlanEntity {
            id: 1,
            name: "Starter".to_string(),
            description: None,
            price_minor: 9_900,
            duration_days: 30,
            max_calls,
            max_minutes,
            features: serde_json::Value::Null,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn active_subscription(user_id: Uuid) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: 11,
            user_id,
            plan_id: 1,
            starts_at: now - Duration::days(1),
            ends_at: now + Duration::days(29),
            is_active: true,
            payment_status: "completed".to_string(),
            payment_amount_minor: 9_900,
            payment_method: None,
            payment_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn record(call_id: &str, status: CallStatus) -> UsageRecordEntity {
        let now = Utc::now();
        UsageRecordEntity {
            id: 1,
            user_id: Uuid::new_v4(),
            subscription_id: Some(11),
            call_id: call_id.to_string(),
            start_time: now - Duration::seconds(90),
            end_time: status.is_terminal().then_some(now),
            duration_sec: status.is_terminal().then_some(90),
            status: status.to_string(),
            caller_number: "+15550001111".to_string(),
            destination_number: "+15550002222".to_string(),
            direction: "outbound".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn start_model(user_id: Uuid) -> StartCallModel {
        StartCallModel {
            user_id,
            call_id: "call-1".to_string(),
            start_time: Utc::now(),
            caller_number: "+15550001111".to_string(),
            destination_number: "+15550002222".to_string(),
            direction: CallDirection::Outbound,
        }
    }

    fn usecase(
        usage: MockUsageRepository,
        subs: MockSubscriptionRepository,
        plans: MockPlanRepository,
    ) -> UsageLedgerUseCase<MockUsageRepository, MockSubscriptionRepository, MockPlanRepository>
    {
        UsageLedgerUseCase::new(Arc::new(usage), Arc::new(subs), Arc::new(plans))
    }

    #[tokio::test]
    async fn call_start_attaches_active_subscription_and_caps() {
        let user_id = Uuid::new_v4();

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_active_by_user()
            .returning(move |uid, _| Ok(Some(active_subscription(uid))));
        let mut plans = MockPlanRepository::new();
        plans
            .expect_find_by_id()
            .returning(|_| Ok(Some(plan(25, 100))));

        let mut usage = MockUsageRepository::new();
        usage.expect_insert_guarded().returning(|insert, guard| {
            let guard = guard.expect("guard must carry the plan caps");
            assert_eq!(guard.subscription_id, 11);
            assert_eq!(guard.max_calls, 25);
            assert_eq!(insert.subscription_id, Some(11));
            assert_eq!(insert.status, "initiated");
            Ok(StartCallOutcome::Started(record(&insert.call_id, CallStatus::Initiated)))
        });

        let usecase = usecase(usage, subs, plans);
        let model = usecase
            .record_call_start(Actor::user(user_id), start_model(user_id))
            .await
            .unwrap();
        assert_eq!(model.status, CallStatus::Initiated);
    }

    #[tokio::test]
    async fn call_start_at_cap_fails_with_limit_exceeded() {
        let user_id = Uuid::new_v4();

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_active_by_user()
            .returning(move |uid, _| Ok(Some(active_subscription(uid))));
        let mut plans = MockPlanRepository::new();
        plans
            .expect_find_by_id()
            .returning(|_| Ok(Some(plan(25, 0))));
        let mut usage = MockUsageRepository::new();
        usage
            .expect_insert_guarded()
            .returning(|_, _| Ok(StartCallOutcome::LimitExceeded));

        let usecase = usecase(usage, subs, plans);
        let err = usecase
            .record_call_start(Actor::user(user_id), start_model(user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::LimitExceeded));
    }

    #[tokio::test]
    async fn call_start_without_subscription_is_unattached() {
        let user_id = Uuid::new_v4();

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_active_by_user().returning(|_, _| Ok(None));
        let mut usage = MockUsageRepository::new();
        usage.expect_insert_guarded().returning(|insert, guard| {
            assert!(guard.is_none());
            assert_eq!(insert.subscription_id, None);
            let mut entity = record(&insert.call_id, CallStatus::Initiated);
            entity.subscription_id = None;
            Ok(StartCallOutcome::Started(entity))
        });

        let usecase = usecase(usage, subs, MockPlanRepository::new());
        let model = usecase
            .record_call_start(Actor::user(user_id), start_model(user_id))
            .await
            .unwrap();
        assert_eq!(model.subscription_id, None);
    }

    #[tokio::test]
    async fn duplicate_call_id_conflicts() {
        let user_id = Uuid::new_v4();

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_active_by_user().returning(|_, _| Ok(None));
        let mut usage = MockUsageRepository::new();
        usage
            .expect_insert_guarded()
            .returning(|_, _| Ok(StartCallOutcome::DuplicateCallId));

        let usecase = usecase(usage, subs, MockPlanRepository::new());
        let err = usecase
            .record_call_start(Actor::user(user_id), start_model(user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn connecting_a_completed_call_is_rejected() {
        let mut usage = MockUsageRepository::new();
        usage
            .expect_find_by_call_id()
            .returning(|id| Ok(Some(record(&id, CallStatus::Completed))));

        let usecase = usecase(
            usage,
            MockSubscriptionRepository::new(),
            MockPlanRepository::new(),
        );
        let err = usecase.mark_connected("call-1").await.unwrap_err();
        assert!(matches!(
            err,
            UseCaseError::InvalidStateTransition {
                from: CallStatus::Completed,
                to: CallStatus::Connected,
            }
        ));
    }

    #[tokio::test]
    async fn ending_an_initiated_call_as_completed_is_rejected() {
        // initiated may fail, but completion requires passing through connected
        let mut usage = MockUsageRepository::new();
        usage
            .expect_find_by_call_id()
            .returning(|id| Ok(Some(record(&id, CallStatus::Initiated))));

        let usecase = usecase(
            usage,
            MockSubscriptionRepository::new(),
            MockPlanRepository::new(),
        );
        let err = usecase
            .record_call_end(
                "call-1",
                EndCallModel {
                    end_time: Utc::now(),
                    status: CallStatus::Completed,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn ending_a_closed_call_is_not_found() {
        let mut usage = MockUsageRepository::new();
        usage
            .expect_find_by_call_id()
            .returning(|id| Ok(Some(record(&id, CallStatus::Failed))));

        let usecase = usecase(
            usage,
            MockSubscriptionRepository::new(),
            MockPlanRepository::new(),
        );
        let err = usecase
            .record_call_end(
                "call-1",
                EndCallModel {
                    end_time: Utc::now(),
                    status: CallStatus::Failed,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn ending_a_connected_call_sets_duration_once() {
        // pinned instants so the computed duration is exact
        let started = Utc.with_ymd_and_hms(2025, 3, 17, 12, 0, 0).unwrap();
        let ended = started + Duration::seconds(90);

        let mut usage = MockUsageRepository::new();
        let mut first_lookup = true;
        usage.expect_find_by_call_id().returning(move |id| {
            if first_lookup {
                first_lookup = false;
                let mut entity = record(&id, CallStatus::Connected);
                entity.start_time = started;
                Ok(Some(entity))
            } else {
                Ok(Some(record(&id, CallStatus::Completed)))
            }
        });
        usage
            .expect_close_call()
            .returning(|_, expected, _, duration_sec, status| {
                assert_eq!(expected, CallStatus::Connected);
                assert_eq!(status, CallStatus::Completed);
                assert_eq!(duration_sec, 90);
                Ok(1)
            });

        let usecase = usecase(
            usage,
            MockSubscriptionRepository::new(),
            MockPlanRepository::new(),
        );
        let model = usecase
            .record_call_end(
                "call-1",
                EndCallModel {
                    end_time: ended,
                    status: CallStatus::Completed,
                },
            )
            .await
            .unwrap();
        assert_eq!(model.status, CallStatus::Completed);
    }

    #[tokio::test]
    async fn usage_percentage_is_owner_or_admin_only() {
        let owner = Uuid::new_v4();

        let mut subs = MockSubscriptionRepository::new();
        subs.expect_find_by_id()
            .returning(move |_| Ok(Some(active_subscription(owner))));
        let mut plans = MockPlanRepository::new();
        plans
            .expect_find_by_id()
            .returning(|_| Ok(Some(plan(100, 0))));
        let mut usage = MockUsageRepository::new();
        usage.expect_totals_for_subscription().returning(|_| {
            Ok(crate::domain::value_objects::usage::UsageTotals {
                calls: 50,
                seconds: 0,
            })
        });

        let usecase = usecase(usage, subs, plans);
        let err = usecase
            .usage_percentage(Actor::user(Uuid::new_v4()), 11)
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Forbidden));

        let pct = usecase
            .usage_percentage(Actor::user(owner), 11)
            .await
            .unwrap();
        assert!((pct - 50.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn monthly_usage_rejects_invalid_month() {
        let user_id = Uuid::new_v4();
        let usecase = usecase(
            MockUsageRepository::new(),
            MockSubscriptionRepository::new(),
            MockPlanRepository::new(),
        );
        let err = usecase
            .monthly_usage(Actor::user(user_id), user_id, 2025, 13)
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::BadRequest(_)));
    }
}
