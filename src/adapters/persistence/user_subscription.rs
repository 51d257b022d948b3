use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{
        ONE_ACTIVE_PER_USER_INDEX, PAYMENT_REFERENCE_UNIQUE, PostgresPersistence,
        transaction::row_to_transaction, violated_unique_constraint,
    },
    app_error::{AppError, AppResult},
    application::use_cases::subscription_ledger::{
        ACTIVE_SUBSCRIPTION_EXISTS, NewSubscription, NewTransaction, REFERENCE_ALREADY_RECORDED,
        UserSubscriptionRepo,
    },
    domain::entities::{
        transaction::Transaction,
        user_subscription::{SubscriptionStatus, UserSubscription},
    },
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> UserSubscription {
    UserSubscription {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan_id: row.get("plan_id"),
        status: row.get("status"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, plan_id, status, start_date, end_date, created_at, updated_at
"#;

const TRANSACTION_COLS: &str = r#"
    id, user_id, subscription_id, amount_minor, currency, payment_reference,
    payment_method, status, created_at, updated_at
"#;

/// Maps a failed insert to the conflict it represents, if any.
fn activation_error(err: sqlx::Error) -> AppError {
    match violated_unique_constraint(&err).as_deref() {
        Some(ONE_ACTIVE_PER_USER_INDEX) => AppError::Conflict(ACTIVE_SUBSCRIPTION_EXISTS.into()),
        Some(PAYMENT_REFERENCE_UNIQUE) => AppError::Conflict(REFERENCE_ALREADY_RECORDED.into()),
        _ => AppError::from(err),
    }
}

#[async_trait]
impl UserSubscriptionRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserSubscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<UserSubscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM user_subscriptions WHERE user_id = $1 AND status = 'active'",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<UserSubscription>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM user_subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }

    async fn create_active_with_transaction(
        &self,
        subscription: &NewSubscription,
        transaction: &NewTransaction,
    ) -> AppResult<(UserSubscription, Transaction)> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        // Both inserts lean on unique constraints; the partial index on
        // active rows serializes concurrent activations for one user.
        let sub_row = sqlx::query(&format!(
            r#"
            INSERT INTO user_subscriptions
                (id, user_id, plan_id, status, start_date, end_date, created_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, $5, now(), now())
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(subscription.plan_id)
        .bind(subscription.start_date)
        .bind(subscription.end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(activation_error)?;

        let txn_row = sqlx::query(&format!(
            r#"
            INSERT INTO transactions
                (id, user_id, subscription_id, amount_minor, currency, payment_reference,
                 payment_method, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now(), now())
            RETURNING {}
            "#,
            TRANSACTION_COLS
        ))
        .bind(transaction.id)
        .bind(transaction.user_id)
        .bind(transaction.subscription_id)
        .bind(transaction.amount.minor_units())
        .bind(&transaction.currency)
        .bind(&transaction.payment_reference)
        .bind(&transaction.payment_method)
        .bind(transaction.status)
        .fetch_one(&mut *tx)
        .await
        .map_err(activation_error)?;

        tx.commit().await.map_err(AppError::from)?;

        Ok((row_to_subscription(&sub_row), row_to_transaction(&txn_row)))
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE user_subscriptions SET status = $3, updated_at = now() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE user_subscriptions SET status = 'expired', updated_at = now() WHERE status = 'active' AND end_date < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
