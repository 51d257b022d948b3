use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

use crate::infra::paystack_gateway::PAYSTACK_API_BASE;

pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub jwt_secret: SecretString,
    pub cors_origin: HeaderValue,
    /// Registers the Paystack gateway when set.
    pub paystack_secret_key: Option<SecretString>,
    pub paystack_base_url: Url,
    /// Where the gateway sends the customer after checkout.
    pub payment_callback_url: String,
    pub expiry_sweep_interval: Duration,
    pub request_timeout: Duration,
    /// Outbound timeout for gateway calls.
    pub gateway_timeout: Duration,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url: String = get_env("DATABASE_URL");
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 10);
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let paystack_secret_key = std::env::var("PAYSTACK_SECRET_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|key| SecretString::new(key.into()));
        let paystack_base_url: Url = get_env_default(
            "PAYSTACK_BASE_URL",
            Url::parse(PAYSTACK_API_BASE).expect("default Paystack URL is valid"),
        );
        let payment_callback_url: String = get_env_default(
            "PAYMENT_CALLBACK_URL",
            "http://localhost:3000/subscription/callback".to_string(),
        );

        let expiry_sweep_interval_secs: u64 = get_env_default("EXPIRY_SWEEP_INTERVAL_SECS", 3600);
        let request_timeout_secs: u64 = get_env_default("REQUEST_TIMEOUT_SECS", 30);
        let gateway_timeout_secs: u64 = get_env_default("GATEWAY_TIMEOUT_SECS", 30);
        let json_logs = get_env_default("LOG_FORMAT", String::from("pretty"))
            .eq_ignore_ascii_case("json");

        Self {
            database_url,
            database_max_connections,
            bind_addr,
            jwt_secret,
            cors_origin,
            paystack_secret_key,
            paystack_base_url,
            payment_callback_url,
            expiry_sweep_interval: Duration::from_secs(expiry_sweep_interval_secs.max(1)),
            request_timeout: Duration::from_secs(request_timeout_secs),
            gateway_timeout: Duration::from_secs(gateway_timeout_secs),
            json_logs,
        }
    }
}
