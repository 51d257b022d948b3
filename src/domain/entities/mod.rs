pub mod money;
pub mod payment_reference;
pub mod subscription_plan;
pub mod transaction;
pub mod user_subscription;
