use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_ledger::TransactionRepo,
    domain::entities::{
        money::Amount,
        transaction::{Transaction, TransactionStatus},
    },
};

pub(crate) fn row_to_transaction(row: &sqlx::postgres::PgRow) -> Transaction {
    Transaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        subscription_id: row.get("subscription_id"),
        amount: Amount::from_minor_units(row.get("amount_minor")),
        currency: row.get("currency"),
        payment_reference: row.get("payment_reference"),
        payment_method: row.get("payment_method"),
        status: row.get("status"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, subscription_id, amount_minor, currency, payment_reference,
    payment_method, status, created_at, updated_at
"#;

#[async_trait]
impl TransactionRepo for PostgresPersistence {
    async fn get_by_reference(&self, reference: &str) -> AppResult<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE payment_reference = $1",
            SELECT_COLS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_transaction))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_transaction).collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> AppResult<Option<Transaction>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE transactions SET status = $3, updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_transaction))
    }
}
