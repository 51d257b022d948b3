pub mod gateway_registry;
pub mod plan_catalog;
pub mod subscription_ledger;
pub mod subscription_orchestrator;
