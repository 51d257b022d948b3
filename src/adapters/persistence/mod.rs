use sqlx::PgPool;

use crate::app_error::AppError;

pub mod subscription_plan;
pub mod transaction;
pub mod user;
pub mod user_subscription;

/// Partial unique index holding at most one active subscription per user.
pub const ONE_ACTIVE_PER_USER_INDEX: &str = "user_subscriptions_one_active_per_user";
pub const PAYMENT_REFERENCE_UNIQUE: &str = "transactions_payment_reference_unique";

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".into()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("A record with this value already exists".into())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::InvalidInput("Referenced record not found".into())
            }
            _ => {
                // Log the actual error for debugging, but don't expose details
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}

/// Name of the unique constraint or index a failed write tripped over.
pub(crate) fn violated_unique_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            db_err.constraint().map(str::to_string)
        }
        _ => None,
    }
}
