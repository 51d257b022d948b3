use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::application::use_cases::subscription_orchestrator::SubscriptionOrchestrator;

/// Periodically expires active subscriptions whose period has ended.
/// The first sweep runs immediately.
pub async fn run_expiry_sweep_loop(orchestrator: Arc<SubscriptionOrchestrator>, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Subscription expiry sweeper started (every {}s)", every.as_secs());

    loop {
        ticker.tick().await;
        sweep_once(&orchestrator).await;
    }
}

/// One sweep. Failures are logged and retried on the next tick.
pub async fn sweep_once(orchestrator: &SubscriptionOrchestrator) -> u64 {
    match orchestrator.check_and_expire_subscriptions().await {
        Ok(expired) => expired,
        Err(err) => {
            error!(error = ?err, "Subscription expiry sweep failed");
            0
        }
    }
}
