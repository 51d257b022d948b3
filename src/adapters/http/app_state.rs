use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        gateway_registry::PaymentGatewayRegistry, plan_catalog::PlanCatalog,
        subscription_orchestrator::SubscriptionOrchestrator,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<PlanCatalog>,
    pub orchestrator: Arc<SubscriptionOrchestrator>,
    pub gateways: Arc<PaymentGatewayRegistry>,
}

impl FromRef<AppState> for Arc<SubscriptionOrchestrator> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.orchestrator.clone()
    }
}

impl FromRef<AppState> for Arc<PlanCatalog> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.catalog.clone()
    }
}
