use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_error::{AppError, AppResult},
    application::validators::{is_valid_currency_code, is_valid_plan_name},
    domain::entities::{
        money::Amount,
        subscription_plan::{MAX_PLAN_DURATION_DAYS, SubscriptionPlan},
    },
};

pub const PLAN_NOT_FOUND: &str = "subscription plan not found";

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanInput {
    #[validate(length(min = 3, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Major units.
    #[validate(range(exclusive_min = 0.0))]
    pub price: f64,
    #[validate(length(equal = 3))]
    pub currency: String,
    /// Days.
    #[validate(range(min = 1, max = MAX_PLAN_DURATION_DAYS))]
    pub duration: i32,
}

/// Sparse update. Empty strings and non-positive numbers count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub duration: Option<i32>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Validated plan ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlan {
    pub name: String,
    pub description: String,
    pub price: Amount,
    pub currency: String,
    pub duration_days: i32,
}

/// Fields to overwrite; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Amount>,
    pub duration_days: Option<i32>,
    pub is_active: Option<bool>,
}

impl CreatePlanInput {
    fn into_new_plan(self) -> AppResult<NewPlan> {
        self.validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;

        let name = self.name.trim().to_string();
        if !is_valid_plan_name(&name) {
            return Err(AppError::InvalidInput(
                "name must be between 3 and 100 characters".into(),
            ));
        }
        if !is_valid_currency_code(&self.currency) {
            return Err(AppError::InvalidInput(
                "currency must be a 3-letter ISO 4217 code".into(),
            ));
        }
        let price = positive_amount(self.price)?;

        Ok(NewPlan {
            name,
            description: self.description.trim().to_string(),
            price,
            currency: self.currency.to_ascii_uppercase(),
            duration_days: self.duration,
        })
    }
}

impl UpdatePlanInput {
    fn into_changes(self) -> AppResult<PlanChanges> {
        let name = match self.name.map(|n| n.trim().to_string()) {
            Some(n) if n.is_empty() => None,
            Some(n) if !is_valid_plan_name(&n) => {
                return Err(AppError::InvalidInput(
                    "name must be between 3 and 100 characters".into(),
                ));
            }
            other => other,
        };

        let price = match self.price {
            Some(p) if p > 0.0 => Some(positive_amount(p)?),
            _ => None,
        };

        let duration_days = match self.duration {
            Some(d) if d > MAX_PLAN_DURATION_DAYS => {
                return Err(AppError::InvalidInput(format!(
                    "duration must be at most {MAX_PLAN_DURATION_DAYS} days"
                )));
            }
            Some(d) if d > 0 => Some(d),
            _ => None,
        };

        Ok(PlanChanges {
            name,
            description: self.description.filter(|d| !d.trim().is_empty()),
            price,
            duration_days,
            is_active: self.is_active,
        })
    }
}

fn positive_amount(major: f64) -> AppResult<Amount> {
    Amount::from_major(major)
        .filter(Amount::is_positive)
        .ok_or_else(|| AppError::InvalidInput("price must be greater than zero".into()))
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Amount,
    pub currency: String,
    pub duration: i32,
    pub is_active: bool,
}

impl From<&SubscriptionPlan> for PlanView {
    fn from(plan: &SubscriptionPlan) -> Self {
        Self {
            id: plan.id,
            name: plan.name.clone(),
            description: plan.description.clone(),
            price: plan.price,
            currency: plan.currency.clone(),
            duration: plan.duration_days,
            is_active: plan.is_active,
        }
    }
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait SubscriptionPlanRepo: Send + Sync {
    /// Excludes soft-deleted plans.
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>>;

    /// Includes soft-deleted plans, for rendering history.
    async fn get_any_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>>;

    /// Active, non-deleted plans ordered by price.
    async fn list_active(&self) -> AppResult<Vec<SubscriptionPlan>>;

    async fn create(&self, plan: &NewPlan) -> AppResult<SubscriptionPlan>;

    /// Returns `None` when the plan is absent or soft-deleted.
    async fn update(&self, id: Uuid, changes: &PlanChanges) -> AppResult<Option<SubscriptionPlan>>;

    /// Returns false when there was nothing to delete.
    async fn soft_delete(&self, id: Uuid) -> AppResult<bool>;
}

// ============================================================================
// Use Cases
// ============================================================================

pub struct PlanCatalog {
    plan_repo: Arc<dyn SubscriptionPlanRepo>,
}

impl PlanCatalog {
    pub fn new(plan_repo: Arc<dyn SubscriptionPlanRepo>) -> Self {
        Self { plan_repo }
    }

    pub async fn list_active(&self) -> AppResult<Vec<SubscriptionPlan>> {
        self.plan_repo.list_active().await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<SubscriptionPlan> {
        self.plan_repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(PLAN_NOT_FOUND.into()))
    }

    /// Resolves a plan even after it was soft-deleted.
    pub async fn get_for_history(&self, id: Uuid) -> AppResult<SubscriptionPlan> {
        self.plan_repo
            .get_any_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(PLAN_NOT_FOUND.into()))
    }

    /// Resolves a plan that a new subscription may be bought on.
    pub async fn get_purchasable(&self, id: Uuid) -> AppResult<SubscriptionPlan> {
        let plan = self.get(id).await?;
        if !plan.is_purchasable() {
            return Err(AppError::InvalidInput(
                "subscription plan is not available".into(),
            ));
        }
        Ok(plan)
    }

    pub async fn create(&self, input: CreatePlanInput) -> AppResult<SubscriptionPlan> {
        let new_plan = input.into_new_plan()?;
        let plan = self.plan_repo.create(&new_plan).await?;
        tracing::info!(plan_id = %plan.id, name = %plan.name, "Created subscription plan");
        Ok(plan)
    }

    pub async fn update(&self, id: Uuid, input: UpdatePlanInput) -> AppResult<SubscriptionPlan> {
        let changes = input.into_changes()?;
        let plan = self
            .plan_repo
            .update(id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound(PLAN_NOT_FOUND.into()))?;
        tracing::info!(plan_id = %plan.id, "Updated subscription plan");
        Ok(plan)
    }

    /// Soft delete. Existing subscriptions keep resolving the plan.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.plan_repo.soft_delete(id).await? {
            return Err(AppError::NotFound(PLAN_NOT_FOUND.into()));
        }
        tracing::info!(plan_id = %id, "Deleted subscription plan");
        Ok(())
    }
}
