use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{
        app_state::AppState,
        auth::{AdminUser, AuthUser},
    },
    app_error::{AppError, AppResult},
    application::validators::is_valid_gateway_name,
    use_cases::subscription_orchestrator::RecordSubscriptionInput,
};

#[derive(Deserialize)]
struct InitializePaymentPayload {
    plan_id: Uuid,
    gateway: String,
}

#[derive(Deserialize)]
struct VerifyPaymentPayload {
    reference: String,
    gateway: String,
}

#[derive(Serialize)]
struct GatewaysResponse {
    gateways: Vec<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscriptions).delete(cancel_subscription))
        .route("/gateways", get(list_gateways))
        .route("/record", post(record_subscription))
        .route("/initialize-payment", post(initialize_payment))
        .route("/verify-payment", post(verify_payment))
        .route("/status", get(subscription_status))
        .route("/transactions", get(list_transactions))
}

/// Registry keys are matched exactly; the name is not normalized.
fn gateway_name(raw: &str) -> AppResult<&str> {
    if !is_valid_gateway_name(raw) {
        return Err(AppError::InvalidInput("gateway is required".into()));
    }
    Ok(raw)
}

async fn list_gateways(
    State(app_state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    Ok(Json(GatewaysResponse {
        gateways: app_state.orchestrator.list_available_gateways(),
    }))
}

async fn record_subscription(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<RecordSubscriptionInput>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state.orchestrator.record_subscription(payload).await?;
    tracing::info!(
        admin_id = %admin.user_id,
        subscription_id = %subscription.id,
        "Subscription recorded via API"
    );
    Ok((StatusCode::CREATED, Json(subscription)))
}

async fn initialize_payment(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<InitializePaymentPayload>,
) -> AppResult<impl IntoResponse> {
    let gateway = gateway_name(&payload.gateway)?;
    let init = app_state
        .orchestrator
        .initialize_payment(user.user_id, payload.plan_id, gateway)
        .await?;
    Ok(Json(init))
}

async fn verify_payment(
    State(app_state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentPayload>,
) -> AppResult<impl IntoResponse> {
    let gateway = gateway_name(&payload.gateway)?;
    let reference = payload.reference.trim();
    if reference.is_empty() {
        return Err(AppError::InvalidInput("reference is required".into()));
    }

    let subscription = app_state
        .orchestrator
        .verify_payment(user.user_id, reference, gateway)
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

async fn subscription_status(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let status = app_state
        .orchestrator
        .get_subscription_status(user.user_id)
        .await?;
    Ok(Json(status))
}

async fn list_subscriptions(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let subscriptions = app_state
        .orchestrator
        .list_user_subscriptions(user.user_id)
        .await?;
    Ok(Json(subscriptions))
}

async fn cancel_subscription(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    app_state.orchestrator.cancel_subscription(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_transactions(
    State(app_state): State<AppState>,
    user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let transactions = app_state
        .orchestrator
        .list_user_transactions(user.user_id)
        .await?;
    Ok(Json(transactions))
}
