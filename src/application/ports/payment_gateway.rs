use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{app_error::AppError, domain::entities::money::Amount};

/// Status literal a gateway reports for a settled charge.
pub const SUCCESS_STATUS: &str = "success";

// ============================================================================
// Port Types - Provider-agnostic payment types
// ============================================================================

/// Identifiers echoed back by the gateway on verification and webhooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct InitializePaymentRequest {
    pub email: String,
    pub amount: Amount,
    pub currency: String,
    pub reference: String,
    pub callback_url: String,
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializePaymentResponse {
    pub reference: String,
    /// Hosted checkout page the buyer is redirected to.
    pub authorization_url: String,
    pub access_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerData {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentVerification {
    pub reference: String,
    pub amount: Amount,
    pub currency: String,
    /// Raw provider status, e.g. "success", "failed", "abandoned".
    pub status: String,
    pub paid_at: Option<String>,
    pub channel: String,
    pub customer: CustomerData,
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventKind {
    ChargeSucceeded,
    ChargeFailed,
    Other(String),
}

/// Provider notification, already authenticated and decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub kind: WebhookEventKind,
    pub reference: Option<String>,
    pub amount: Option<Amount>,
    pub currency: Option<String>,
    pub channel: Option<String>,
    pub metadata: PaymentMetadata,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum GatewayError {
    /// Network failure, timeout, 5xx or an undecodable response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The provider answered with an explicit refusal.
    #[error("{0}")]
    Rejected(String),

    /// A payload that could not be decoded as a provider event.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl GatewayError {
    pub fn into_app_error(self, gateway: &str, operation: &'static str) -> AppError {
        match self {
            GatewayError::Transport(message) => AppError::GatewayUnavailable {
                gateway: gateway.to_string(),
                operation,
                message,
            },
            GatewayError::Rejected(message) => AppError::PaymentRejected {
                gateway: gateway.to_string(),
                operation,
                message,
            },
            GatewayError::Malformed(message) => AppError::InvalidInput(message),
        }
    }
}

// ============================================================================
// Port
// ============================================================================

/// A payment provider integration. Amounts cross this boundary as [`Amount`];
/// conversion to the provider's wire units happens inside the adapter.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Registry key, also used in webhook URLs.
    fn name(&self) -> &str;

    /// Header the provider puts its webhook signature in.
    fn signature_header(&self) -> &'static str;

    async fn initialize(
        &self,
        request: &InitializePaymentRequest,
    ) -> Result<InitializePaymentResponse, GatewayError>;

    async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, GatewayError>;

    /// Authenticates a raw webhook body against the provider signature.
    fn validate_webhook(&self, signature: &str, payload: &[u8]) -> bool;

    fn parse_webhook_event(&self, payload: &[u8]) -> Result<WebhookEvent, GatewayError>;

    /// Whether a verification status means the money was captured.
    fn is_success_status(&self, status: &str) -> bool {
        status == SUCCESS_STATUS
    }
}
