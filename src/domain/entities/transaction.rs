use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::money::Amount;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    /// Completed is final. A failed charge may still be settled by a late
    /// success notification.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        match (self, next) {
            (TransactionStatus::Pending, TransactionStatus::Completed)
            | (TransactionStatus::Pending, TransactionStatus::Failed)
            | (TransactionStatus::Failed, TransactionStatus::Completed) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub amount: Amount,
    pub currency: String,
    pub payment_reference: String,
    pub payment_method: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
