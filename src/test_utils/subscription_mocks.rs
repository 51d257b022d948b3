//! In-memory mock implementations for the subscription repository traits and
//! a scriptable payment gateway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_gateway::{
            CustomerData, GatewayError, InitializePaymentRequest, InitializePaymentResponse,
            PaymentGateway, PaymentMetadata, PaymentVerification, WebhookEvent,
        },
        use_cases::{
            plan_catalog::{NewPlan, PlanChanges, SubscriptionPlanRepo},
            subscription_ledger::{
                ACTIVE_SUBSCRIPTION_EXISTS, NewSubscription, NewTransaction,
                REFERENCE_ALREADY_RECORDED, TransactionRepo, UserSubscriptionRepo,
            },
            subscription_orchestrator::UserDirectory,
        },
    },
    domain::entities::{
        money::Amount,
        subscription_plan::SubscriptionPlan,
        transaction::{Transaction, TransactionStatus},
        user_subscription::{SubscriptionStatus, UserSubscription},
    },
    infra::paystack_gateway::{parse_event, verify_signature},
};

// ============================================================================
// InMemorySubscriptionPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionPlanRepo {
    pub plans: Mutex<HashMap<Uuid, SubscriptionPlan>>,
}

impl InMemorySubscriptionPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<SubscriptionPlan>) -> Self {
        let map: HashMap<Uuid, SubscriptionPlan> = plans.into_iter().map(|p| (p.id, p)).collect();
        Self {
            plans: Mutex::new(map),
        }
    }

    pub fn mark_deleted(&self, id: Uuid) {
        if let Some(plan) = self.plans.lock().unwrap().get_mut(&id) {
            plan.deleted_at = Some(Utc::now());
        }
    }
}

#[async_trait]
impl SubscriptionPlanRepo for InMemorySubscriptionPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .get(&id)
            .filter(|p| !p.is_deleted())
            .cloned())
    }

    async fn get_any_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<SubscriptionPlan>> {
        let mut plans: Vec<SubscriptionPlan> = self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.is_active && !p.is_deleted())
            .cloned()
            .collect();
        plans.sort_by_key(|p| p.price);
        Ok(plans)
    }

    async fn create(&self, plan: &NewPlan) -> AppResult<SubscriptionPlan> {
        let now = Utc::now();
        let plan = SubscriptionPlan {
            id: Uuid::new_v4(),
            name: plan.name.clone(),
            description: plan.description.clone(),
            price: plan.price,
            currency: plan.currency.clone(),
            duration_days: plan.duration_days,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.plans.lock().unwrap().insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(&self, id: Uuid, changes: &PlanChanges) -> AppResult<Option<SubscriptionPlan>> {
        let mut plans = self.plans.lock().unwrap();
        let Some(plan) = plans.get_mut(&id).filter(|p| !p.is_deleted()) else {
            return Ok(None);
        };
        if let Some(name) = &changes.name {
            plan.name = name.clone();
        }
        if let Some(description) = &changes.description {
            plan.description = description.clone();
        }
        if let Some(price) = changes.price {
            plan.price = price;
        }
        if let Some(duration) = changes.duration_days {
            plan.duration_days = duration;
        }
        if let Some(is_active) = changes.is_active {
            plan.is_active = is_active;
        }
        plan.updated_at = Utc::now();
        Ok(Some(plan.clone()))
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<bool> {
        let mut plans = self.plans.lock().unwrap();
        match plans.get_mut(&id) {
            Some(plan) if !plan.is_deleted() => {
                plan.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

// ============================================================================
// InMemorySubscriptionStore
// ============================================================================

/// Subscriptions and transactions behind one lock, so the combined insert is
/// atomic the way the Postgres transaction is.
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    subscriptions: Vec<UserSubscription>,
    transactions: Vec<Transaction>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriptions(subscriptions: Vec<UserSubscription>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                subscriptions,
                transactions: Vec::new(),
            }),
        }
    }

    pub fn with_transactions(self, transactions: Vec<Transaction>) -> Self {
        self.state.lock().unwrap().transactions.extend(transactions);
        self
    }

    pub fn subscription_count(&self) -> usize {
        self.state.lock().unwrap().subscriptions.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.state.lock().unwrap().transactions.len()
    }
}

fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

#[async_trait]
impl UserSubscriptionRepo for InMemorySubscriptionStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserSubscription>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<UserSubscription>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .find(|s| s.user_id == user_id && s.status.is_active())
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<UserSubscription>> {
        let subscriptions: Vec<UserSubscription> = self
            .state
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(subscriptions, |s| s.created_at))
    }

    async fn create_active_with_transaction(
        &self,
        subscription: &NewSubscription,
        transaction: &NewTransaction,
    ) -> AppResult<(UserSubscription, Transaction)> {
        let mut state = self.state.lock().unwrap();

        if state
            .subscriptions
            .iter()
            .any(|s| s.user_id == subscription.user_id && s.status.is_active())
        {
            return Err(AppError::Conflict(ACTIVE_SUBSCRIPTION_EXISTS.into()));
        }
        if state
            .transactions
            .iter()
            .any(|t| t.payment_reference == transaction.payment_reference)
        {
            return Err(AppError::Conflict(REFERENCE_ALREADY_RECORDED.into()));
        }

        let now = Utc::now();
        let created_subscription = UserSubscription {
            id: subscription.id,
            user_id: subscription.user_id,
            plan_id: subscription.plan_id,
            status: SubscriptionStatus::Active,
            start_date: subscription.start_date,
            end_date: subscription.end_date,
            created_at: now,
            updated_at: now,
        };
        let created_transaction = Transaction {
            id: transaction.id,
            user_id: transaction.user_id,
            subscription_id: transaction.subscription_id,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            payment_reference: transaction.payment_reference.clone(),
            payment_method: transaction.payment_method.clone(),
            status: transaction.status,
            created_at: now,
            updated_at: now,
        };

        state.subscriptions.push(created_subscription.clone());
        state.transactions.push(created_transaction.clone());
        Ok((created_subscription, created_transaction))
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().unwrap();
        match state
            .subscriptions
            .iter_mut()
            .find(|s| s.id == id && s.status == from)
        {
            Some(subscription) => {
                subscription.status = to;
                subscription.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.state.lock().unwrap();
        let mut expired = 0;
        for subscription in state
            .subscriptions
            .iter_mut()
            .filter(|s| s.status.is_active() && s.end_date < now)
        {
            subscription.status = SubscriptionStatus::Expired;
            subscription.updated_at = now;
            expired += 1;
        }
        Ok(expired)
    }
}

#[async_trait]
impl TransactionRepo for InMemorySubscriptionStore {
    async fn get_by_reference(&self, reference: &str) -> AppResult<Option<Transaction>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .find(|t| t.payment_reference == reference)
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<Transaction>> {
        let transactions: Vec<Transaction> = self
            .state
            .lock()
            .unwrap()
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(transactions, |t| t.created_at))
    }

    async fn update_status(
        &self,
        id: Uuid,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> AppResult<Option<Transaction>> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .transactions
            .iter_mut()
            .find(|t| t.id == id && t.status == from)
            .map(|t| {
                t.status = to;
                t.updated_at = Utc::now();
                t.clone()
            }))
    }
}

// ============================================================================
// InMemoryUserDirectory
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserDirectory {
    pub emails: Mutex<HashMap<Uuid, String>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(user_id: Uuid, email: &str) -> Self {
        let directory = Self::new();
        directory
            .emails
            .lock()
            .unwrap()
            .insert(user_id, email.to_string());
        directory
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn get_email(&self, user_id: Uuid) -> AppResult<Option<String>> {
        Ok(self.emails.lock().unwrap().get(&user_id).cloned())
    }
}

// ============================================================================
// StubPaymentGateway
// ============================================================================

pub const STUB_WEBHOOK_SECRET: &str = "whsec_stub";
pub const STUB_SIGNATURE_HEADER: &str = "x-webhook-signature";

struct StubBehavior {
    status: String,
    amount: Amount,
    currency: String,
    metadata: PaymentMetadata,
    transport_failure: bool,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            status: "success".to_string(),
            amount: Amount::from_minor_units(100_000),
            currency: "NGN".to_string(),
            metadata: PaymentMetadata::default(),
            transport_failure: false,
        }
    }
}

/// Gateway double that echoes references, records calls and answers
/// verification with whatever the test configured. Webhooks use the Paystack
/// signature and payload format keyed by [`STUB_WEBHOOK_SECRET`].
pub struct StubPaymentGateway {
    name: String,
    behavior: Mutex<StubBehavior>,
    initialize_requests: Mutex<Vec<InitializePaymentRequest>>,
    verify_calls: AtomicUsize,
}

impl StubPaymentGateway {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            behavior: Mutex::new(StubBehavior::default()),
            initialize_requests: Mutex::new(Vec::new()),
            verify_calls: AtomicUsize::new(0),
        }
    }

    pub fn succeed_with(&self, amount: Amount, currency: &str) {
        let mut behavior = self.behavior.lock().unwrap();
        behavior.status = "success".to_string();
        behavior.amount = amount;
        behavior.currency = currency.to_string();
        behavior.transport_failure = false;
    }

    pub fn respond_with_status(&self, status: &str) {
        self.behavior.lock().unwrap().status = status.to_string();
    }

    pub fn echo_metadata(&self, metadata: PaymentMetadata) {
        self.behavior.lock().unwrap().metadata = metadata;
    }

    pub fn fail_transport(&self) {
        self.behavior.lock().unwrap().transport_failure = true;
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_requests.lock().unwrap().len()
    }

    pub fn last_initialize(&self) -> Option<InitializePaymentRequest> {
        self.initialize_requests.lock().unwrap().last().cloned()
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature_header(&self) -> &'static str {
        STUB_SIGNATURE_HEADER
    }

    async fn initialize(
        &self,
        request: &InitializePaymentRequest,
    ) -> Result<InitializePaymentResponse, GatewayError> {
        self.initialize_requests.lock().unwrap().push(request.clone());
        if self.behavior.lock().unwrap().transport_failure {
            return Err(GatewayError::Transport("connection refused".into()));
        }
        Ok(InitializePaymentResponse {
            reference: request.reference.clone(),
            authorization_url: format!("https://checkout.test/{}", request.reference),
            access_code: "access_test".to_string(),
        })
    }

    async fn verify_payment(&self, reference: &str) -> Result<PaymentVerification, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap();
        if behavior.transport_failure {
            return Err(GatewayError::Transport("connection refused".into()));
        }
        Ok(PaymentVerification {
            reference: reference.to_string(),
            amount: behavior.amount,
            currency: behavior.currency.clone(),
            status: behavior.status.clone(),
            paid_at: None,
            channel: "card".to_string(),
            customer: CustomerData {
                email: "buyer@example.com".to_string(),
            },
            metadata: behavior.metadata.clone(),
        })
    }

    fn validate_webhook(&self, signature: &str, payload: &[u8]) -> bool {
        verify_signature(STUB_WEBHOOK_SECRET.as_bytes(), signature, payload)
    }

    fn parse_webhook_event(&self, payload: &[u8]) -> Result<WebhookEvent, GatewayError> {
        parse_event(payload)
    }
}
