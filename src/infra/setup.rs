use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        gateway_registry::PaymentGatewayRegistry,
        plan_catalog::{PlanCatalog, SubscriptionPlanRepo},
        subscription_ledger::{SubscriptionLedger, TransactionRepo, UserSubscriptionRepo},
        subscription_orchestrator::{SubscriptionOrchestrator, UserDirectory},
    },
    infra::{
        config::AppConfig, http_client::try_build_client_with_timeout,
        paystack_gateway::PaystackGateway, postgres_persistence,
    },
};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let postgres_arc = Arc::new(
        postgres_persistence(&config.database_url, config.database_max_connections).await?,
    );

    let gateways = Arc::new(build_gateway_registry(&config)?);
    if gateways.is_empty() {
        tracing::warn!("No payment gateways configured; checkout is unavailable");
    }

    let catalog = Arc::new(PlanCatalog::new(
        postgres_arc.clone() as Arc<dyn SubscriptionPlanRepo>
    ));
    let ledger = Arc::new(SubscriptionLedger::new(
        postgres_arc.clone() as Arc<dyn UserSubscriptionRepo>,
        postgres_arc.clone() as Arc<dyn TransactionRepo>,
    ));
    let orchestrator = Arc::new(SubscriptionOrchestrator::new(
        catalog.clone(),
        ledger,
        gateways.clone(),
        postgres_arc as Arc<dyn UserDirectory>,
        config.payment_callback_url.clone(),
    ));

    Ok(AppState {
        config: Arc::new(config),
        catalog,
        orchestrator,
        gateways,
    })
}

fn build_gateway_registry(config: &AppConfig) -> anyhow::Result<PaymentGatewayRegistry> {
    let mut registry = PaymentGatewayRegistry::new();

    if let Some(secret_key) = &config.paystack_secret_key {
        let client = try_build_client_with_timeout(config.gateway_timeout)?;
        registry.register(Arc::new(PaystackGateway::new(
            client,
            config.paystack_base_url.clone(),
            secret_key.clone(),
        )));
    }

    Ok(registry)
}

pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "subkeeper=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        // Structured logs for log shippers
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
            .ok();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false) // don't show target (module path)
                    .with_level(true)
                    .pretty(),
            )
            .try_init()
            .ok();
    }
}
