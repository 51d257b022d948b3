use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, auth::AdminUser},
    app_error::AppResult,
    use_cases::plan_catalog::{CreatePlanInput, PlanView, UpdatePlanInput},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/{id}", put(update_plan).delete(delete_plan))
}

async fn list_plans(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let plans = app_state.catalog.list_active().await?;
    Ok(Json(plans.iter().map(PlanView::from).collect::<Vec<_>>()))
}

async fn create_plan(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<CreatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state.catalog.create(payload).await?;
    tracing::debug!(admin_id = %admin.user_id, plan_id = %plan.id, "Plan created via API");
    Ok((StatusCode::CREATED, Json(PlanView::from(&plan))))
}

async fn update_plan(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state.catalog.update(id, payload).await?;
    Ok(Json(PlanView::from(&plan)))
}

async fn delete_plan(
    State(app_state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    app_state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
