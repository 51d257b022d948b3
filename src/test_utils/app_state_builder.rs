//! Test app state builder for HTTP-level integration testing.
//!
//! This module provides `TestAppStateBuilder` which creates a minimal `AppState`
//! with in-memory mocks for testing HTTP endpoints.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt::{self, ADMIN_ROLE, USER_ROLE},
        use_cases::{
            gateway_registry::PaymentGatewayRegistry, plan_catalog::PlanCatalog,
            subscription_ledger::SubscriptionLedger,
            subscription_orchestrator::SubscriptionOrchestrator,
        },
    },
    domain::entities::{
        subscription_plan::SubscriptionPlan, transaction::Transaction,
        user_subscription::UserSubscription,
    },
    infra::config::AppConfig,
    test_utils::{
        InMemorySubscriptionPlanRepo, InMemorySubscriptionStore, InMemoryUserDirectory,
        StubPaymentGateway,
    },
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";
pub const TEST_GATEWAY: &str = "stub";

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let plan = create_test_plan(|p| p.name = "Monthly".to_string());
///
/// let (app_state, gateway, store) = TestAppStateBuilder::new()
///     .with_plan(plan)
///     .with_user(user_id, "buyer@example.com")
///     .build_with_mocks();
/// ```
pub struct TestAppStateBuilder {
    plans: Vec<SubscriptionPlan>,
    subscriptions: Vec<UserSubscription>,
    transactions: Vec<Transaction>,
    users: Vec<(Uuid, String)>,
    gateway_name: String,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            plans: vec![],
            subscriptions: vec![],
            transactions: vec![],
            users: vec![],
            gateway_name: TEST_GATEWAY.to_string(),
        }
    }

    pub fn with_plan(mut self, plan: SubscriptionPlan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn with_subscription(mut self, subscription: UserSubscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.transactions.push(transaction);
        self
    }

    /// Register a user the directory can resolve to an email address.
    pub fn with_user(mut self, user_id: Uuid, email: &str) -> Self {
        self.users.push((user_id, email.to_string()));
        self
    }

    /// Name the stub gateway is registered under. Defaults to `TEST_GATEWAY`.
    pub fn with_gateway_name(mut self, name: &str) -> Self {
        self.gateway_name = name.to_string();
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    /// Returns the stub gateway and the subscription store alongside the
    /// state, for assertions.
    pub fn build_with_mocks(
        self,
    ) -> (
        AppState,
        Arc<StubPaymentGateway>,
        Arc<InMemorySubscriptionStore>,
    ) {
        let plan_repo = Arc::new(InMemorySubscriptionPlanRepo::with_plans(self.plans));
        let store = Arc::new(
            InMemorySubscriptionStore::with_subscriptions(self.subscriptions)
                .with_transactions(self.transactions),
        );
        let users = Arc::new(InMemoryUserDirectory::new());
        {
            let mut emails = users.emails.lock().unwrap();
            for (user_id, email) in self.users {
                emails.insert(user_id, email);
            }
        }

        let gateway = Arc::new(StubPaymentGateway::named(&self.gateway_name));
        let gateways = Arc::new(PaymentGatewayRegistry::new().with_gateway(gateway.clone()));

        let catalog = Arc::new(PlanCatalog::new(plan_repo));
        let ledger = Arc::new(SubscriptionLedger::new(store.clone(), store.clone()));
        let orchestrator = Arc::new(SubscriptionOrchestrator::new(
            catalog.clone(),
            ledger,
            gateways.clone(),
            users,
            "http://localhost:3000/subscription/callback".to_string(),
        ));

        // Create minimal config for testing
        let config = Arc::new(AppConfig {
            database_url: String::new(),
            database_max_connections: 1,
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            paystack_secret_key: None,
            paystack_base_url: Url::parse("http://127.0.0.1:9").unwrap(),
            payment_callback_url: "http://localhost:3000/subscription/callback".to_string(),
            expiry_sweep_interval: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(30),
            gateway_timeout: Duration::from_secs(5),
            json_logs: false,
        });

        let app_state = AppState {
            config,
            catalog,
            orchestrator,
            gateways,
        };

        (app_state, gateway, store)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `Authorization` header value for a regular user.
pub fn user_bearer(user_id: Uuid) -> String {
    bearer(user_id, USER_ROLE)
}

/// `Authorization` header value for an admin.
pub fn admin_bearer(user_id: Uuid) -> String {
    bearer(user_id, ADMIN_ROLE)
}

fn bearer(user_id: Uuid, role: &str) -> String {
    let secret = SecretString::new(TEST_JWT_SECRET.into());
    let token = jwt::issue(user_id, role, &secret, chrono::Duration::hours(1)).unwrap();
    format!("Bearer {token}")
}
