use std::sync::Arc;

use chrono::{Datelike, Duration, Utc};
use uuid::Uuid;

use crate::{
    application::usecases::errors::{UseCaseError, UseCaseResult},
    domain::{
        repositories::{
            plans::PlanRepository, subscriptions::SubscriptionRepository,
            usage::UsageRepository,
        },
        value_objects::{
            dashboards::{
                cap_warning, expiry_warning, month_start, AdminOverviewModel, UserDashboardModel,
            },
            iam::Actor,
            plans::PlanModel,
            subscriptions::{RevenueStatsModel, SubscriptionAnalyticsModel, SubscriptionModel},
            usage::{
                usage_percentage, MonthlyUsageModel, UsageAnalyticsModel, UsageFilter,
                UsageRecordModel, UsageTotals,
            },
        },
    },
};

const EXPIRING_SOON_DAYS: i64 = 7;
const EXPIRING_SOON_LIMIT: i64 = 10;
const RECENT_USAGE_LIMIT: usize = 10;
const OVERVIEW_USAGE_DAYS: i64 = 30;

/// Read-only aggregation over the other components; it owns no state of
/// its own.
pub struct DashboardUseCase<S, P, U>
where
    S: SubscriptionRepository + 'static,
    P: PlanRepository + 'static,
    U: UsageRepository + 'static,
{
    subscription_repo: Arc<S>,
    plan_repo: Arc<P>,
    usage_repo: Arc<U>,
}

impl<S, P, U> DashboardUseCase<S, P, U>
where
    S: SubscriptionRepository + 'static,
    P: PlanRepository + 'static,
    U: UsageRepository + 'static,
{
    pub fn new(subscription_repo: Arc<S>, plan_repo: Arc<P>, usage_repo: Arc<U>) -> Self {
        Self {
            subscription_repo,
            plan_repo,
            usage_repo,
        }
    }

    pub async fn admin_overview(&self, actor: Actor) -> UseCaseResult<AdminOverviewModel> {
        if !actor.is_admin {
            return Err(UseCaseError::Forbidden);
        }
        let now = Utc::now();

        let counts = self
            .subscription_repo
            .counts(now)
            .await
            .map_err(UseCaseError::Internal)?;
        let conversion_rate = if counts.total > 0 {
            counts.active as f64 / counts.total as f64 * 100.0
        } else {
            0.0
        };
        let subscription_analytics = SubscriptionAnalyticsModel {
            total_subscriptions: counts.total,
            active_subscriptions: counts.active,
            expired_subscriptions: counts.expired,
            monthly_revenue_minor: counts.monthly_revenue_minor,
            total_revenue_minor: counts.total_revenue_minor,
            conversion_rate,
        };

        let rows = self
            .subscription_repo
            .revenue_rows(Some(month_start(now)), Some(now))
            .await
            .map_err(UseCaseError::Internal)?;
        let total_revenue_minor: i64 = rows.iter().map(|row| row.revenue_minor).sum();
        let total_subscriptions: i64 = rows.iter().map(|row| row.subscriptions).sum();
        let monthly_revenue = RevenueStatsModel {
            total_revenue_minor,
            total_subscriptions,
            average_revenue_minor: if total_subscriptions > 0 {
                total_revenue_minor / total_subscriptions
            } else {
                0
            },
            plan_breakdown: rows,
        };

        let expiring_subscriptions = self
            .subscription_repo
            .expiring_within(now, EXPIRING_SOON_DAYS, EXPIRING_SOON_LIMIT)
            .await
            .map_err(UseCaseError::Internal)?
            .into_iter()
            .map(|entity| SubscriptionModel::from_entity(entity, now))
            .collect();

        let window = self
            .usage_repo
            .list(UsageFilter {
                start_date: Some(now - Duration::days(OVERVIEW_USAGE_DAYS)),
                end_date: Some(now),
                ..Default::default()
            })
            .await
            .map_err(UseCaseError::Internal)?;
        let usage_analytics = UsageAnalyticsModel::aggregate(OVERVIEW_USAGE_DAYS, &window);

        let active_calls = self
            .usage_repo
            .active_calls()
            .await
            .map_err(UseCaseError::Internal)?
            .len() as i64;

        Ok(AdminOverviewModel {
            subscription_analytics,
            usage_analytics,
            monthly_revenue,
            expiring_subscriptions,
            active_calls,
        })
    }

    pub async fn user_dashboard(
        &self,
        actor: Actor,
        user_id: Uuid,
    ) -> UseCaseResult<UserDashboardModel> {
        if !actor.can_act_for(user_id) {
            return Err(UseCaseError::Forbidden);
        }
        let now = Utc::now();

        let subscription = self
            .subscription_repo
            .find_active_by_user(user_id, now)
            .await
            .map_err(UseCaseError::Internal)?;

        let mut plan = None;
        let mut totals = UsageTotals::default();
        let mut percentage = 0.0;
        let mut warnings = Vec::new();

        if let Some(subscription) = &subscription {
            let plan_entity = self
                .plan_repo
                .find_by_id(subscription.plan_id)
                .await
                .map_err(UseCaseError::Internal)?
                .ok_or(UseCaseError::NotFound("plan"))?;
            totals = self
                .usage_repo
                .totals_for_subscription(subscription.id)
                .await
                .map_err(UseCaseError::Internal)?;

            percentage = usage_percentage(totals, plan_entity.max_calls, plan_entity.max_minutes);
            let call_pct = usage_percentage(totals, plan_entity.max_calls, 0);
            let minute_pct = usage_percentage(totals, 0, plan_entity.max_minutes);
            warnings.extend(cap_warning("call limit", call_pct));
            warnings.extend(cap_warning("minute limit", minute_pct));

            let days_remaining = (subscription.ends_at - now).num_days();
            if now <= subscription.ends_at {
                warnings.extend(expiry_warning(days_remaining));
            }

            plan = Some(PlanModel::from(plan_entity));
        }

        let records = self
            .usage_repo
            .list_in_period(user_id, month_start(now), now)
            .await
            .map_err(UseCaseError::Internal)?;
        let current_month_usage = MonthlyUsageModel::aggregate(now.year(), now.month(), &records);

        let mut recent: Vec<_> = records;
        recent.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        recent.truncate(RECENT_USAGE_LIMIT);
        let recent_usage = recent.into_iter().map(UsageRecordModel::from).collect();

        Ok(UserDashboardModel {
            active_subscription: subscription
                .map(|entity| SubscriptionModel::from_entity(entity, now)),
            plan,
            usage_percentage: percentage,
            current_month_usage,
            recent_usage,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::{
            plans::PlanEntity, subscriptions::SubscriptionEntity,
            usage_records::UsageRecordEntity,
        },
        repositories::{
            plans::MockPlanRepository, subscriptions::MockSubscriptionRepository,
            usage::MockUsageRepository,
        },
        value_objects::{
            dashboards::WarningSeverity,
            subscriptions::{PlanRevenueRow, SubscriptionCounts},
        },
    };
    use chrono::Duration;

    fn subscription(user_id: Uuid, ends_in_days: i64) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            id: 7,
            user_id,
            plan_id: 1,
            starts_at: now - Duration::days(10),
            ends_at: now + Duration::days(ends_in_days),
            is_active: true,
            payment_status: "completed".to_string(),
            payment_amount_minor: 1_000,
            payment_method: None,
            payment_ref: None,
            created_at: now - Duration::days(10),
            updated_at: now - Duration::days(10),
        }
    }

    fn plan(max_calls: i32, max_minutes: i32) -> PlanEntity {
        let now = Utc::now();
        PlanEntity {
            id: 1,
            name: "Pro".to_string(),
            description: None,
            price_minor: 1_000,
            duration_days: 30,
            max_calls,
            max_minutes,
            features: serde_json::Value::Null,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn record(user_id: Uuid, call_id: &str, duration_sec: Option<i32>) -> UsageRecordEntity {
        let now = Utc::now();
        UsageRecordEntity {
            id: 1,
            user_id,
            subscription_id: Some(7),
            call_id: call_id.to_string(),
            start_time: now - Duration::minutes(5),
            end_time: duration_sec.map(|_| now),
            duration_sec,
            status: if duration_sec.is_some() {
                "completed".to_string()
            } else {
                "initiated".to_string()
            },
            caller_number: "+15550001111".to_string(),
            destination_number: "+15550002222".to_string(),
            direction: "outbound".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn usecase(
        subscriptions: MockSubscriptionRepository,
        plans: MockPlanRepository,
        usage: MockUsageRepository,
    ) -> DashboardUseCase<MockSubscriptionRepository, MockPlanRepository, MockUsageRepository>
    {
        DashboardUseCase::new(Arc::new(subscriptions), Arc::new(plans), Arc::new(usage))
    }

    #[tokio::test]
    async fn admin_overview_requires_admin() {
        let usecase = usecase(
            MockSubscriptionRepository::new(),
            MockPlanRepository::new(),
            MockUsageRepository::new(),
        );
        let err = usecase
            .admin_overview(Actor::user(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Forbidden));
    }

    #[tokio::test]
    async fn admin_overview_assembles_all_sections() {
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions.expect_counts().returning(|_| {
            Ok(SubscriptionCounts {
                total: 10,
                active: 4,
                expired: 6,
                monthly_revenue_minor: 4_000,
                total_revenue_minor: 10_000,
            })
        });
        subscriptions.expect_revenue_rows().returning(|_, _| {
            Ok(vec![PlanRevenueRow {
                plan_name: "Pro".to_string(),
                subscriptions: 4,
                revenue_minor: 4_000,
            }])
        });
        subscriptions
            .expect_expiring_within()
            .returning(|_, _, _| Ok(vec![subscription(Uuid::new_v4(), 2)]));
        let mut usage = MockUsageRepository::new();
        usage.expect_list().returning(|filter| {
            assert!(filter.start_date.is_some());
            assert!(filter.end_date.is_some());
            Ok(vec![
                record(Uuid::new_v4(), "a", Some(60)),
                record(Uuid::new_v4(), "b", Some(180)),
                record(Uuid::new_v4(), "c", None),
            ])
        });
        usage.expect_active_calls().returning(|| {
            Ok(vec![
                record(Uuid::new_v4(), "a", None),
                record(Uuid::new_v4(), "b", None),
            ])
        });

        let usecase = usecase(subscriptions, MockPlanRepository::new(), usage);
        let overview = usecase
            .admin_overview(Actor::admin(Uuid::new_v4()))
            .await
            .unwrap();
        assert_eq!(overview.active_calls, 2);
        assert_eq!(overview.expiring_subscriptions.len(), 1);
        assert_eq!(overview.monthly_revenue.average_revenue_minor, 1_000);
        assert!((overview.subscription_analytics.conversion_rate - 40.0).abs() < f64::EPSILON);
        // open call counted, closed durations averaged
        assert_eq!(overview.usage_analytics.total_calls, 3);
        assert_eq!(overview.usage_analytics.total_duration_sec, 240);
        assert!((overview.usage_analytics.avg_duration_sec - 120.0).abs() < f64::EPSILON);
        assert_eq!(overview.usage_analytics.status_breakdown["completed"], 2);
    }

    #[tokio::test]
    async fn user_dashboard_warns_near_call_cap_and_expiry() {
        let user_id = Uuid::new_v4();
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_active_by_user()
            .returning(move |_, _| Ok(Some(subscription(user_id, 2))));
        let mut plans = MockPlanRepository::new();
        plans
            .expect_find_by_id()
            .returning(|_| Ok(Some(plan(100, 0))));
        let mut usage = MockUsageRepository::new();
        usage.expect_totals_for_subscription().returning(|_| {
            Ok(UsageTotals {
                calls: 96,
                seconds: 600,
            })
        });
        usage
            .expect_list_in_period()
            .returning(move |_, _, _| Ok(vec![record(user_id, "a", Some(120))]));

        let usecase = usecase(subscriptions, plans, usage);
        let dashboard = usecase
            .user_dashboard(Actor::user(user_id), user_id)
            .await
            .unwrap();

        assert!((dashboard.usage_percentage - 96.0).abs() < f64::EPSILON);
        let kinds: Vec<_> = dashboard.warnings.iter().map(|w| w.kind.as_str()).collect();
        assert!(kinds.contains(&"call limit"));
        assert!(kinds.contains(&"subscription_expiry"));
        let expiry = dashboard
            .warnings
            .iter()
            .find(|w| w.kind == "subscription_expiry")
            .unwrap();
        assert_eq!(expiry.severity, WarningSeverity::High);
        assert_eq!(dashboard.current_month_usage.total_calls, 1);
        assert_eq!(dashboard.recent_usage.len(), 1);
    }

    #[tokio::test]
    async fn user_dashboard_without_subscription_has_no_warnings() {
        let user_id = Uuid::new_v4();
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_active_by_user()
            .returning(|_, _| Ok(None));
        let mut usage = MockUsageRepository::new();
        usage
            .expect_list_in_period()
            .returning(|_, _, _| Ok(Vec::new()));

        let usecase = usecase(subscriptions, MockPlanRepository::new(), usage);
        let dashboard = usecase
            .user_dashboard(Actor::user(user_id), user_id)
            .await
            .unwrap();
        assert!(dashboard.active_subscription.is_none());
        assert!(dashboard.plan.is_none());
        assert!(dashboard.warnings.is_empty());
        assert_eq!(dashboard.usage_percentage, 0.0);
    }

    #[tokio::test]
    async fn viewing_another_users_dashboard_requires_admin() {
        let usecase = usecase(
            MockSubscriptionRepository::new(),
            MockPlanRepository::new(),
            MockUsageRepository::new(),
        );
        let err = usecase
            .user_dashboard(Actor::user(Uuid::new_v4()), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, UseCaseError::Forbidden));
    }
}
