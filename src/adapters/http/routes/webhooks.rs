use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    use_cases::subscription_orchestrator::WebhookOutcome,
};

#[derive(Serialize)]
struct WebhookAck {
    outcome: WebhookOutcome,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook/{gateway}", post(receive_webhook))
}

/// The body is taken as raw bytes; the signature covers exactly what the
/// provider sent.
async fn receive_webhook(
    State(app_state): State<AppState>,
    Path(gateway): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let header_name = app_state.gateways.get(&gateway)?.signature_header();

    let signature = headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!(gateway = %gateway, "Webhook without signature header");
            AppError::InvalidSignature
        })?;

    let outcome = app_state
        .orchestrator
        .handle_webhook(&gateway, signature, &body)
        .await?;
    Ok(Json(WebhookAck { outcome }))
}
