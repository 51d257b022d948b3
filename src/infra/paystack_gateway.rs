use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha512;

use crate::{
    application::ports::payment_gateway::{
        CustomerData, GatewayError, InitializePaymentRequest, InitializePaymentResponse,
        PaymentGateway, PaymentMetadata, PaymentVerification, WebhookEvent, WebhookEventKind,
    },
    domain::entities::money::Amount,
};

pub const PAYSTACK_API_BASE: &str = "https://api.paystack.co";
pub const PAYSTACK_GATEWAY_NAME: &str = "paystack";
pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

const EVENT_CHARGE_SUCCESS: &str = "charge.success";
const EVENT_CHARGE_FAILED: &str = "charge.failed";

type HmacSha512 = Hmac<Sha512>;

#[derive(Clone)]
pub struct PaystackGateway {
    client: Client,
    base_url: Url,
    secret_key: SecretString,
}

impl PaystackGateway {
    pub fn new(client: Client, base_url: Url, secret_key: SecretString) -> Self {
        Self {
            client,
            base_url,
            secret_key,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GatewayError::Transport("Paystack base URL cannot hold a path".into()))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    fn name(&self) -> &str {
        PAYSTACK_GATEWAY_NAME
    }

    fn signature_header(&self) -> &'static str {
        PAYSTACK_SIGNATURE_HEADER
    }

    async fn initialize(
        &self,
        request: &InitializePaymentRequest,
    ) -> Result<InitializePaymentResponse, GatewayError> {
        let body = InitializeBody {
            email: &request.email,
            amount: request.amount.minor_units(),
            currency: &request.currency,
            reference: &request.reference,
            callback_url: &request.callback_url,
            metadata: &request.metadata,
        };

        let response = self
            .client
            .post(self.endpoint(&["transaction", "initialize"])?)
            .bearer_auth(self.secret_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("Paystack request failed: {}", e)))?;

        let data: InitializeData = handle_response(response).await?;
        Ok(InitializePaymentResponse {
            reference: data.reference,
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, GatewayError> {
        let response = self
            .client
            .get(self.endpoint(&["transaction", "verify", reference])?)
            .bearer_auth(self.secret_key.expose_secret())
            .send()
            .await
            .map_err(|e| GatewayError::Transport(format!("Paystack request failed: {}", e)))?;

        let data: VerifyData = handle_response(response).await?;
        Ok(PaymentVerification {
            reference: data.reference,
            amount: Amount::from_minor_units(data.amount),
            currency: data.currency,
            status: data.status,
            paid_at: data.paid_at,
            channel: data.channel.unwrap_or_default(),
            customer: CustomerData {
                email: data.customer.and_then(|c| c.email).unwrap_or_default(),
            },
            metadata: metadata_from_value(&data.metadata),
        })
    }

    fn validate_webhook(&self, signature: &str, payload: &[u8]) -> bool {
        verify_signature(self.secret_key.expose_secret().as_bytes(), signature, payload)
    }

    fn parse_webhook_event(&self, payload: &[u8]) -> Result<WebhookEvent, GatewayError> {
        parse_event(payload)
    }
}

// ============================================================================
// Signatures & events
// ============================================================================

/// Hex HMAC-SHA512 of the raw body, keyed by the secret key.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = match HmacSha512::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature against the raw body.
pub fn verify_signature(secret: &[u8], signature: &str, payload: &[u8]) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha512::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, GatewayError> {
    let wire: WebhookWire =
        serde_json::from_slice(payload).map_err(|e| GatewayError::Malformed(e.to_string()))?;

    let kind = match wire.event.as_str() {
        EVENT_CHARGE_SUCCESS => WebhookEventKind::ChargeSucceeded,
        EVENT_CHARGE_FAILED => WebhookEventKind::ChargeFailed,
        other => WebhookEventKind::Other(other.to_string()),
    };

    let data = wire.data;
    Ok(WebhookEvent {
        kind,
        reference: data.reference.filter(|r| !r.is_empty()),
        amount: data.amount.map(Amount::from_minor_units),
        currency: data.currency,
        channel: data.channel,
        metadata: metadata_from_value(&data.metadata),
    })
}

/// Paystack echoes metadata as an object, a JSON string, or `""` when unset.
fn metadata_from_value(value: &serde_json::Value) -> PaymentMetadata {
    match value {
        serde_json::Value::Object(_) => {
            serde_json::from_value(value.clone()).unwrap_or_default()
        }
        serde_json::Value::String(raw) if !raw.is_empty() => {
            serde_json::from_str(raw).unwrap_or_default()
        }
        _ => PaymentMetadata::default(),
    }
}

async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Transport(format!("Failed to read response: {}", e)))?;

    if status.is_server_error() {
        tracing::error!(status = %status, body = %body, "Paystack API error");
        return Err(GatewayError::Transport(format!("Paystack returned {}", status)));
    }

    let envelope: PaystackEnvelope<serde_json::Value> = serde_json::from_str(&body).map_err(|e| {
        tracing::error!(status = %status, body = %body, error = %e, "Failed to parse Paystack response");
        GatewayError::Transport(format!("Failed to parse Paystack response: {}", e))
    })?;

    if !envelope.status || !status.is_success() {
        tracing::warn!(status = %status, message = %envelope.message, "Paystack rejected request");
        let message = if envelope.message.is_empty() {
            format!("Paystack returned {}", status)
        } else {
            envelope.message
        };
        return Err(GatewayError::Rejected(message));
    }

    let data = envelope
        .data
        .ok_or_else(|| GatewayError::Transport("Paystack response missing data".into()))?;

    serde_json::from_value(data).map_err(|e| {
        tracing::error!(error = %e, "Unexpected Paystack response data");
        GatewayError::Transport(format!("Failed to parse Paystack response: {}", e))
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PaystackEnvelope<T> {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

#[derive(Serialize)]
struct InitializeBody<'a> {
    email: &'a str,
    amount: i64,
    currency: &'a str,
    reference: &'a str,
    callback_url: &'a str,
    metadata: &'a PaymentMetadata,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    reference: String,
    amount: i64,
    currency: String,
    status: String,
    paid_at: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    customer: Option<CustomerWire>,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CustomerWire {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookWire {
    event: String,
    #[serde(default)]
    data: WebhookDataWire,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookDataWire {
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
}
