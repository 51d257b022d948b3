//! HTTP client factory with consistent timeout configuration.
//!
//! Gateway adapters get their `reqwest::Client` from here so every outbound
//! call is bounded by a connect and a total request timeout.

use reqwest::Client;
use std::time::Duration;

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout (total request/response time).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build an HTTP client with the default timeouts.
pub fn try_build_client() -> Result<Client, reqwest::Error> {
    try_build_client_with_timeout(DEFAULT_REQUEST_TIMEOUT)
}

/// Build an HTTP client with an explicit total request timeout.
pub fn try_build_client_with_timeout(request_timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(request_timeout))
        .timeout(request_timeout)
        .build()
}
