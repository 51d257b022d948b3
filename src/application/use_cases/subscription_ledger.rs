use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        money::Amount,
        subscription_plan::SubscriptionPlan,
        transaction::{Transaction, TransactionStatus},
        user_subscription::{SubscriptionStatus, UserSubscription},
    },
};

pub const ACTIVE_SUBSCRIPTION_EXISTS: &str = "user already has an active subscription";
pub const REFERENCE_ALREADY_RECORDED: &str = "payment reference already recorded";
pub const NO_ACTIVE_SUBSCRIPTION: &str = "no active subscription";

// ============================================================================
// Input Types
// ============================================================================

/// A verified payment to turn into a subscription.
#[derive(Debug, Clone)]
pub struct ActivationInput<'a> {
    pub user_id: Uuid,
    pub plan: &'a SubscriptionPlan,
    pub amount: Amount,
    pub currency: String,
    pub payment_reference: String,
    pub payment_method: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub amount: Amount,
    pub currency: String,
    pub payment_reference: String,
    pub payment_method: String,
    pub status: TransactionStatus,
}

/// Result of applying a gateway-reported status to a recorded transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionReconciliation {
    Updated(Transaction),
    /// Already in the requested state, or the transition is not allowed.
    Unchanged(Transaction),
    /// No transaction carries this reference.
    Missing,
}

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait UserSubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserSubscription>>;

    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<UserSubscription>>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<UserSubscription>>;

    /// Inserts an active subscription and its transaction as one unit.
    ///
    /// Fails with `Conflict(ACTIVE_SUBSCRIPTION_EXISTS)` if the user already
    /// holds an active subscription and `Conflict(REFERENCE_ALREADY_RECORDED)`
    /// if the reference is taken. Nothing is written on failure.
    async fn create_active_with_transaction(
        &self,
        subscription: &NewSubscription,
        transaction: &NewTransaction,
    ) -> AppResult<(UserSubscription, Transaction)>;

    /// Moves `id` from `from` to `to`. Returns false when the row was not in
    /// `from` any more.
    async fn update_status(
        &self,
        id: Uuid,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> AppResult<bool>;

    /// Marks every active subscription with `end_date < now` as expired.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

#[async_trait]
pub trait TransactionRepo: Send + Sync {
    async fn get_by_reference(&self, reference: &str) -> AppResult<Option<Transaction>>;

    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Transaction>>;

    /// Moves `id` from `from` to `to`. Returns the row if it changed.
    async fn update_status(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> AppResult<Option<Transaction>>;
}

// ============================================================================
// Use Cases
// ============================================================================

pub struct SubscriptionLedger {
    subscription_repo: Arc<dyn UserSubscriptionRepo>,
    transaction_repo: Arc<dyn TransactionRepo>,
}

impl SubscriptionLedger {
    pub fn new(
        subscription_repo: Arc<dyn UserSubscriptionRepo>,
        transaction_repo: Arc<dyn TransactionRepo>,
    ) -> Self {
        Self {
            subscription_repo,
            transaction_repo,
        }
    }

    pub async fn get_active(&self, user_id: Uuid) -> AppResult<Option<UserSubscription>> {
        self.subscription_repo.get_active_by_user(user_id).await
    }

    pub async fn get_subscription(&self, id: Uuid) -> AppResult<Option<UserSubscription>> {
        self.subscription_repo.get_by_id(id).await
    }

    pub async fn list_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<UserSubscription>> {
        self.subscription_repo.list_by_user(user_id).await
    }

    pub async fn find_transaction(&self, reference: &str) -> AppResult<Option<Transaction>> {
        self.transaction_repo.get_by_reference(reference).await
    }

    pub async fn list_transactions(&self, user_id: Uuid) -> AppResult<Vec<Transaction>> {
        self.transaction_repo.list_by_user(user_id).await
    }

    /// Creates the active subscription and its completed transaction for a
    /// verified payment. The period runs from `started_at` for the plan's
    /// duration.
    pub async fn activate(
        &self,
        input: ActivationInput<'_>,
    ) -> AppResult<(UserSubscription, Transaction)> {
        if input.plan.duration_days <= 0 {
            return Err(AppError::InvalidInput(
                "subscription plan has no duration".into(),
            ));
        }

        let end_date = input.plan.period_end(input.started_at).ok_or_else(|| {
            AppError::InvalidInput("subscription plan duration is out of range".into())
        })?;

        let subscription = NewSubscription {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            plan_id: input.plan.id,
            start_date: input.started_at,
            end_date,
        };
        let transaction = NewTransaction {
            id: Uuid::new_v4(),
            user_id: input.user_id,
            subscription_id: subscription.id,
            amount: input.amount,
            currency: input.currency,
            payment_reference: input.payment_reference,
            payment_method: input.payment_method,
            status: TransactionStatus::Completed,
        };

        let (subscription, transaction) = self
            .subscription_repo
            .create_active_with_transaction(&subscription, &transaction)
            .await?;

        tracing::info!(
            user_id = %subscription.user_id,
            subscription_id = %subscription.id,
            plan_id = %subscription.plan_id,
            reference = %transaction.payment_reference,
            end_date = %subscription.end_date,
            "Activated subscription"
        );
        Ok((subscription, transaction))
    }

    pub async fn cancel(&self, user_id: Uuid) -> AppResult<UserSubscription> {
        let active = self
            .subscription_repo
            .get_active_by_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(NO_ACTIVE_SUBSCRIPTION.into()))?;

        let moved = self
            .subscription_repo
            .update_status(active.id, SubscriptionStatus::Active, SubscriptionStatus::Cancelled)
            .await?;
        if !moved {
            // Expired or cancelled between the read and the write.
            return Err(AppError::NotFound(NO_ACTIVE_SUBSCRIPTION.into()));
        }

        tracing::info!(user_id = %user_id, subscription_id = %active.id, "Cancelled subscription");
        Ok(UserSubscription {
            status: SubscriptionStatus::Cancelled,
            ..active
        })
    }

    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        self.subscription_repo.expire_overdue(now).await
    }

    /// Applies a gateway-reported status to the transaction with `reference`.
    /// Repeating the same status is a no-op and completed is never downgraded.
    pub async fn record_transaction_status(
        &self,
        reference: &str,
        status: TransactionStatus,
    ) -> AppResult<TransactionReconciliation> {
        let Some(current) = self.transaction_repo.get_by_reference(reference).await? else {
            return Ok(TransactionReconciliation::Missing);
        };

        if !current.status.can_transition_to(status) {
            if current.status != status {
                tracing::warn!(
                    reference = %reference,
                    current = %current.status,
                    requested = %status,
                    "Ignored transaction status change"
                );
            }
            return Ok(TransactionReconciliation::Unchanged(current));
        }

        match self
            .transaction_repo
            .update_status(current.id, current.status, status)
            .await?
        {
            Some(updated) => {
                tracing::info!(
                    reference = %reference,
                    from = %current.status,
                    to = %updated.status,
                    "Reconciled transaction"
                );
                Ok(TransactionReconciliation::Updated(updated))
            }
            // Lost a race with another writer; report what is stored now.
            None => match self.transaction_repo.get_by_reference(reference).await? {
                Some(stored) => Ok(TransactionReconciliation::Unchanged(stored)),
                None => Ok(TransactionReconciliation::Missing),
            },
        }
    }
}
