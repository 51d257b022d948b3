use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{
            InitializePaymentRequest, PaymentGateway, PaymentMetadata, WebhookEvent,
            WebhookEventKind,
        },
        use_cases::{
            gateway_registry::PaymentGatewayRegistry,
            plan_catalog::{PlanCatalog, PlanView},
            subscription_ledger::{
                ACTIVE_SUBSCRIPTION_EXISTS, ActivationInput, REFERENCE_ALREADY_RECORDED,
                SubscriptionLedger, TransactionReconciliation,
            },
        },
        validators::{is_valid_currency_code, is_valid_email},
    },
    domain::entities::{
        money::Amount,
        payment_reference::{MalformedReference, PaymentReference},
        subscription_plan::SubscriptionPlan,
        transaction::{Transaction, TransactionStatus},
        user_subscription::{SubscriptionStatus, UserSubscription},
    },
};

pub const USER_NOT_FOUND: &str = "user not found";
pub const NO_SUBSCRIPTION_STATUS: &str = "none";

// ============================================================================
// Collaborators
// ============================================================================

/// Read-only view of the identity service's user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_email(&self, user_id: Uuid) -> AppResult<Option<String>>;
}

// ============================================================================
// Input Types
// ============================================================================

/// A payment settled outside the checkout flow, recorded by an operator.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordSubscriptionInput {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    /// Major units.
    #[validate(range(exclusive_min = 0.0))]
    pub amount: f64,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(min = 1, max = 100))]
    pub payment_reference: String,
    #[serde(default)]
    pub payment_method: String,
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentInitialization {
    pub reference: String,
    pub authorization_url: String,
    pub access_code: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSubscriptionView {
    pub id: Uuid,
    pub plan: PlanView,
    pub status: SubscriptionStatus,
    /// Unix seconds.
    pub start_date: i64,
    /// Unix seconds.
    pub end_date: i64,
    pub is_active: bool,
    pub days_remaining: i64,
}

impl UserSubscriptionView {
    fn new(subscription: &UserSubscription, plan: &SubscriptionPlan, now: DateTime<Utc>) -> Self {
        Self {
            id: subscription.id,
            plan: PlanView::from(plan),
            status: subscription.status,
            start_date: subscription.start_date.timestamp(),
            end_date: subscription.end_date.timestamp(),
            is_active: subscription.status.is_active(),
            days_remaining: subscription.days_remaining(now),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionStatusView {
    pub has_subscription: bool,
    pub status: String,
    pub days_remaining: i64,
    /// Unix seconds, 0 without a subscription.
    pub end_date: i64,
}

impl SubscriptionStatusView {
    fn none() -> Self {
        Self {
            has_subscription: false,
            status: NO_SUBSCRIPTION_STATUS.to_string(),
            days_remaining: 0,
            end_date: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransactionView {
    pub id: Uuid,
    pub amount: Amount,
    pub currency: String,
    pub payment_reference: String,
    pub payment_method: String,
    pub status: TransactionStatus,
    /// Unix seconds.
    pub created_at: i64,
}

impl From<&Transaction> for TransactionView {
    fn from(txn: &Transaction) -> Self {
        Self {
            id: txn.id,
            amount: txn.amount,
            currency: txn.currency.clone(),
            payment_reference: txn.payment_reference.clone(),
            payment_method: txn.payment_method.clone(),
            status: txn.status,
            created_at: txn.created_at.timestamp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// An existing transaction moved to the reported status.
    Reconciled,
    /// No record existed; the subscription was created from the event.
    SubscriptionCreated,
    /// Authenticated but nothing to do.
    Ignored,
}

// ============================================================================
// Use Cases
// ============================================================================

pub struct SubscriptionOrchestrator {
    catalog: Arc<PlanCatalog>,
    ledger: Arc<SubscriptionLedger>,
    gateways: Arc<PaymentGatewayRegistry>,
    users: Arc<dyn UserDirectory>,
    callback_url: String,
}

impl SubscriptionOrchestrator {
    pub fn new(
        catalog: Arc<PlanCatalog>,
        ledger: Arc<SubscriptionLedger>,
        gateways: Arc<PaymentGatewayRegistry>,
        users: Arc<dyn UserDirectory>,
        callback_url: String,
    ) -> Self {
        Self {
            catalog,
            ledger,
            gateways,
            users,
            callback_url,
        }
    }

    pub fn list_available_gateways(&self) -> Vec<String> {
        self.gateways.list_available()
    }

    /// Starts checkout for `plan_id` and returns the provider's hosted page.
    /// Nothing is persisted until the payment is verified.
    pub async fn initialize_payment(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        gateway_name: &str,
    ) -> AppResult<PaymentInitialization> {
        let email = self
            .users
            .get_email(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))?;
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput(
                "user has no valid email address".into(),
            ));
        }

        let plan = self.catalog.get_purchasable(plan_id).await?;

        if self.ledger.get_active(user_id).await?.is_some() {
            return Err(AppError::Conflict(ACTIVE_SUBSCRIPTION_EXISTS.into()));
        }

        let gateway = self.gateways.get(gateway_name)?;
        let reference = PaymentReference::issue(user_id, plan.id, Utc::now()).to_string();

        let request = InitializePaymentRequest {
            email,
            amount: plan.price,
            currency: plan.currency.clone(),
            reference: reference.clone(),
            callback_url: self.callback_url.clone(),
            metadata: PaymentMetadata {
                user_id: Some(user_id),
                plan_id: Some(plan.id),
            },
        };

        let response = gateway
            .initialize(&request)
            .await
            .map_err(|e| e.into_app_error(gateway.name(), "initialize"))?;

        if response.reference != reference {
            tracing::warn!(
                gateway = %gateway.name(),
                sent = %reference,
                returned = %response.reference,
                "Gateway returned a different payment reference"
            );
        }

        tracing::info!(
            user_id = %user_id,
            plan_id = %plan.id,
            gateway = %gateway.name(),
            reference = %reference,
            "Initialized payment"
        );

        Ok(PaymentInitialization {
            reference,
            authorization_url: response.authorization_url,
            access_code: response.access_code,
        })
    }

    /// Confirms a payment with the gateway and activates the subscription it
    /// paid for. Repeating a verification that already succeeded returns the
    /// same subscription.
    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        reference: &str,
        gateway_name: &str,
    ) -> AppResult<UserSubscriptionView> {
        let parsed: PaymentReference = reference
            .parse()
            .map_err(|e: MalformedReference| AppError::InvalidInput(e.to_string()))?;
        if !parsed.belongs_to(user_id) {
            return Err(AppError::InvalidInput(
                "payment reference does not belong to this user".into(),
            ));
        }

        if let Some(view) = self.recorded_subscription(user_id, reference).await? {
            return Ok(view);
        }

        let gateway = self.gateways.get(gateway_name)?;
        let verification = gateway
            .verify_payment(reference)
            .await
            .map_err(|e| e.into_app_error(gateway.name(), "verify"))?;

        if !gateway.is_success_status(&verification.status) {
            tracing::info!(
                user_id = %user_id,
                reference = %reference,
                status = %verification.status,
                "Payment not successful"
            );
            return Err(AppError::PaymentVerificationFailed(verification.status));
        }

        if verification.reference != reference {
            return Err(AppError::InvalidInput(
                "gateway verified a different payment reference".into(),
            ));
        }
        if let Some(metadata_plan) = verification.metadata.plan_id {
            if metadata_plan != parsed.plan_id() {
                return Err(AppError::InvalidInput(
                    "payment metadata does not match the reference".into(),
                ));
            }
        }

        let plan = self.catalog.get_for_history(parsed.plan_id()).await?;
        let now = Utc::now();
        let activation = ActivationInput {
            user_id,
            plan: &plan,
            amount: verification.amount,
            currency: verification.currency,
            payment_reference: reference.to_string(),
            payment_method: verification.channel,
            started_at: now,
        };

        match self.ledger.activate(activation).await {
            Ok((subscription, _)) => Ok(UserSubscriptionView::new(&subscription, &plan, now)),
            // A webhook may have recorded the same payment in the meantime.
            Err(AppError::Conflict(msg)) if msg == REFERENCE_ALREADY_RECORDED => self
                .recorded_subscription(user_id, reference)
                .await?
                .ok_or(AppError::Conflict(msg)),
            Err(e) => Err(e),
        }
    }

    /// View of the subscription a recorded reference paid for, if any.
    async fn recorded_subscription(
        &self,
        user_id: Uuid,
        reference: &str,
    ) -> AppResult<Option<UserSubscriptionView>> {
        let Some(txn) = self.ledger.find_transaction(reference).await? else {
            return Ok(None);
        };
        if txn.user_id != user_id {
            return Err(AppError::Conflict(REFERENCE_ALREADY_RECORDED.into()));
        }

        let subscription = self
            .ledger
            .get_subscription(txn.subscription_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("transaction {} has no subscription", txn.id))
            })?;
        let plan = self.catalog.get_for_history(subscription.plan_id).await?;
        Ok(Some(UserSubscriptionView::new(&subscription, &plan, Utc::now())))
    }

    /// Records a subscription for a payment confirmed out of band. The same
    /// one-active and unique-reference rules as checkout apply.
    pub async fn record_subscription(
        &self,
        input: RecordSubscriptionInput,
    ) -> AppResult<UserSubscriptionView> {
        input
            .validate()
            .map_err(|e| AppError::InvalidInput(e.to_string()))?;
        if !is_valid_currency_code(&input.currency) {
            return Err(AppError::InvalidInput(
                "currency must be a 3-letter ISO 4217 code".into(),
            ));
        }
        let payment_reference = input.payment_reference.trim().to_string();
        if payment_reference.is_empty() {
            return Err(AppError::InvalidInput("payment reference is required".into()));
        }
        let amount = Amount::from_major(input.amount)
            .filter(Amount::is_positive)
            .ok_or_else(|| AppError::InvalidInput("amount must be greater than zero".into()))?;

        let plan = self.catalog.get(input.plan_id).await?;
        let now = Utc::now();
        let activation = ActivationInput {
            user_id: input.user_id,
            plan: &plan,
            amount,
            currency: input.currency.to_ascii_uppercase(),
            payment_reference,
            payment_method: input.payment_method.trim().to_string(),
            started_at: now,
        };

        let (subscription, _) = self.ledger.activate(activation).await?;
        Ok(UserSubscriptionView::new(&subscription, &plan, now))
    }

    pub async fn get_subscription_status(&self, user_id: Uuid) -> AppResult<SubscriptionStatusView> {
        let Some(subscription) = self.ledger.get_active(user_id).await? else {
            return Ok(SubscriptionStatusView::none());
        };

        Ok(SubscriptionStatusView {
            has_subscription: true,
            status: subscription.status.to_string(),
            days_remaining: subscription.days_remaining(Utc::now()),
            end_date: subscription.end_date.timestamp(),
        })
    }

    /// Every subscription of the user, newest first. Subscriptions whose plan
    /// no longer resolves are left out.
    pub async fn list_user_subscriptions(&self, user_id: Uuid) -> AppResult<Vec<UserSubscriptionView>> {
        let now = Utc::now();
        let mut views = Vec::new();
        for subscription in self.ledger.list_subscriptions(user_id).await? {
            match self.catalog.get_for_history(subscription.plan_id).await {
                Ok(plan) => views.push(UserSubscriptionView::new(&subscription, &plan, now)),
                Err(AppError::NotFound(_)) => {
                    tracing::warn!(
                        subscription_id = %subscription.id,
                        plan_id = %subscription.plan_id,
                        "Skipping subscription with unknown plan"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(views)
    }

    pub async fn list_user_transactions(&self, user_id: Uuid) -> AppResult<Vec<TransactionView>> {
        let transactions = self.ledger.list_transactions(user_id).await?;
        Ok(transactions.iter().map(TransactionView::from).collect())
    }

    pub async fn cancel_subscription(&self, user_id: Uuid) -> AppResult<()> {
        self.ledger.cancel(user_id).await.map(|_| ())
    }

    /// Expires every active subscription past its end date.
    pub async fn check_and_expire_subscriptions(&self) -> AppResult<u64> {
        let expired = self.ledger.expire_overdue(Utc::now()).await?;
        if expired > 0 {
            tracing::info!(count = expired, "Expired overdue subscriptions");
        }
        Ok(expired)
    }

    /// Authenticates a provider notification and reconciles local records
    /// with it.
    pub async fn handle_webhook(
        &self,
        gateway_name: &str,
        signature: &str,
        payload: &[u8],
    ) -> AppResult<WebhookOutcome> {
        let gateway = self.gateways.get(gateway_name)?;

        if !gateway.validate_webhook(signature, payload) {
            tracing::warn!(gateway = %gateway_name, "Rejected webhook with invalid signature");
            return Err(AppError::InvalidSignature);
        }

        // Redelivery cannot fix a body that does not parse.
        let event = match gateway.parse_webhook_event(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(gateway = %gateway_name, error = %e, "Ignoring unparseable webhook");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        let target = match &event.kind {
            WebhookEventKind::ChargeSucceeded => TransactionStatus::Completed,
            WebhookEventKind::ChargeFailed => TransactionStatus::Failed,
            WebhookEventKind::Other(name) => {
                tracing::debug!(gateway = %gateway_name, event = %name, "Ignoring webhook event");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        let Some(reference) = event.reference.as_deref() else {
            tracing::warn!(gateway = %gateway_name, "Charge webhook without reference");
            return Ok(WebhookOutcome::Ignored);
        };

        match self.ledger.record_transaction_status(reference, target).await? {
            TransactionReconciliation::Updated(_) => Ok(WebhookOutcome::Reconciled),
            TransactionReconciliation::Unchanged(_) => Ok(WebhookOutcome::Ignored),
            TransactionReconciliation::Missing if target == TransactionStatus::Completed => {
                self.materialize_from_event(gateway.as_ref(), reference, &event)
                    .await
            }
            TransactionReconciliation::Missing => Ok(WebhookOutcome::Ignored),
        }
    }

    /// Creates the subscription for a successful charge that was never
    /// verified through the API, using the identifiers echoed in metadata.
    async fn materialize_from_event(
        &self,
        gateway: &dyn PaymentGateway,
        reference: &str,
        event: &WebhookEvent,
    ) -> AppResult<WebhookOutcome> {
        let Some(user_id) = event.metadata.user_id else {
            tracing::warn!(gateway = %gateway.name(), reference = %reference, "Charge without user metadata");
            return Ok(WebhookOutcome::Ignored);
        };

        let parsed = match reference.parse::<PaymentReference>() {
            Ok(parsed) if parsed.belongs_to(user_id) => parsed,
            _ => {
                tracing::warn!(gateway = %gateway.name(), reference = %reference, "Charge with foreign reference");
                return Ok(WebhookOutcome::Ignored);
            }
        };
        if event.metadata.plan_id.is_some_and(|p| p != parsed.plan_id()) {
            tracing::warn!(gateway = %gateway.name(), reference = %reference, "Charge metadata does not match reference");
            return Ok(WebhookOutcome::Ignored);
        }

        let plan = match self.catalog.get_for_history(parsed.plan_id()).await {
            Ok(plan) => plan,
            Err(AppError::NotFound(_)) => {
                tracing::warn!(reference = %reference, plan_id = %parsed.plan_id(), "Charge for unknown plan");
                return Ok(WebhookOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };

        let activation = ActivationInput {
            user_id,
            plan: &plan,
            amount: event.amount.unwrap_or(plan.price),
            currency: event.currency.clone().unwrap_or_else(|| plan.currency.clone()),
            payment_reference: reference.to_string(),
            payment_method: event.channel.clone().unwrap_or_default(),
            started_at: Utc::now(),
        };

        match self.ledger.activate(activation).await {
            Ok(_) => Ok(WebhookOutcome::SubscriptionCreated),
            Err(AppError::Conflict(reason)) => {
                tracing::info!(reference = %reference, reason = %reason, "Charge already settled");
                Ok(WebhookOutcome::Ignored)
            }
            Err(e) => Err(e),
        }
    }
}
