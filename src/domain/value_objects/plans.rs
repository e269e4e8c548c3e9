use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::entities::plans::{EditPlanEntity, InsertPlanEntity, PlanEntity};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanModel {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i32,
    pub duration_days: i32,
    pub max_calls: i32,
    pub max_minutes: i32,
    pub features: Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PlanEntity> for PlanModel {
    fn from(entity: PlanEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            price_minor: entity.price_minor,
            duration_days: entity.duration_days,
            max_calls: entity.max_calls,
            max_minutes: entity.max_minutes,
            features: entity.features,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlanModel {
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i32,
    pub duration_days: i32,
    #[serde(default)]
    pub max_calls: i32,
    #[serde(default)]
    pub max_minutes: i32,
    #[serde(default)]
    pub features: Option<Value>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl CreatePlanModel {
    pub fn to_entity(&self) -> InsertPlanEntity {
        InsertPlanEntity {
            name: self.name.clone(),
            description: self.description.clone(),
            price_minor: self.price_minor,
            duration_days: self.duration_days,
            max_calls: self.max_calls,
            max_minutes: self.max_minutes,
            features: self.features.clone().unwrap_or(Value::Null),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlanModel {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_minor: Option<i32>,
    pub duration_days: Option<i32>,
    pub max_calls: Option<i32>,
    pub max_minutes: Option<i32>,
    pub features: Option<Value>,
}

impl UpdatePlanModel {
    pub fn to_entity(&self) -> EditPlanEntity {
        EditPlanEntity {
            name: self.name.clone(),
            description: self.description.clone(),
            price_minor: self.price_minor,
            duration_days: self.duration_days,
            max_calls: self.max_calls,
            max_minutes: self.max_minutes,
            features: self.features.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// Subscription counters a plan accumulates over its lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanStats {
    pub total_subscriptions: i64,
    pub active_subscriptions: i64,
    pub revenue_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanWithStatsModel {
    #[serde(flatten)]
    pub plan: PlanModel,
    pub stats: PlanStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularPlanModel {
    #[serde(flatten)]
    pub plan: PlanModel,
    pub active_subscriptions: i64,
}
