//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    money::Amount,
    subscription_plan::SubscriptionPlan,
    transaction::{Transaction, TransactionStatus},
    user_subscription::{SubscriptionStatus, UserSubscription},
};

/// Create a test subscription plan with sensible defaults.
pub fn create_test_plan(overrides: impl FnOnce(&mut SubscriptionPlan)) -> SubscriptionPlan {
    let now = test_datetime();
    let mut plan = SubscriptionPlan {
        id: Uuid::new_v4(),
        name: "Monthly Plan".to_string(),
        description: "Thirty days of access".to_string(),
        price: Amount::from_minor_units(100_000),
        currency: "NGN".to_string(),
        duration_days: 30,
        is_active: true,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    overrides(&mut plan);
    plan
}

/// Create an active 30-day subscription that started now.
pub fn create_test_subscription(
    user_id: Uuid,
    overrides: impl FnOnce(&mut UserSubscription),
) -> UserSubscription {
    let now = test_datetime();
    let mut subscription = UserSubscription {
        id: Uuid::new_v4(),
        user_id,
        plan_id: Uuid::new_v4(),
        status: SubscriptionStatus::Active,
        start_date: now,
        end_date: now + Duration::days(30),
        created_at: now,
        updated_at: now,
    };
    overrides(&mut subscription);
    subscription
}

/// Create a completed transaction with a unique reference.
pub fn create_test_transaction(
    user_id: Uuid,
    overrides: impl FnOnce(&mut Transaction),
) -> Transaction {
    let now = test_datetime();
    let mut transaction = Transaction {
        id: Uuid::new_v4(),
        user_id,
        subscription_id: Uuid::new_v4(),
        amount: Amount::from_minor_units(100_000),
        currency: "NGN".to_string(),
        payment_reference: format!("TEST_{}", Uuid::new_v4().simple()),
        payment_method: "card".to_string(),
        status: TransactionStatus::Completed,
        created_at: now,
        updated_at: now,
    };
    overrides(&mut transaction);
    transaction
}

pub fn test_datetime() -> DateTime<Utc> {
    Utc::now()
}
