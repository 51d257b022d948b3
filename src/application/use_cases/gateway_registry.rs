use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_gateway::PaymentGateway,
};

/// Name-keyed set of payment gateways, assembled once at startup and shared
/// read-only afterwards.
#[derive(Clone, Default)]
pub struct PaymentGatewayRegistry {
    gateways: HashMap<String, Arc<dyn PaymentGateway>>,
}

impl PaymentGatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `gateway` under its own name. A later registration with the
    /// same name replaces the earlier one.
    pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
        let name = gateway.name().to_string();
        if self.gateways.insert(name.clone(), gateway).is_some() {
            tracing::warn!(gateway = %name, "Replaced previously registered payment gateway");
        } else {
            tracing::info!(gateway = %name, "Registered payment gateway");
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.register(gateway);
        self
    }

    /// Looks up a gateway by exact, case-sensitive name.
    pub fn get(&self, name: &str) -> AppResult<Arc<dyn PaymentGateway>> {
        self.gateways
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::GatewayNotFound(name.to_string()))
    }

    /// Registered gateway names, sorted.
    pub fn list_available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.gateways.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }
}
