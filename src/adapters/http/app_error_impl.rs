use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        if self.is_retryable() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::warn!(error = ?self, "Request failed");
        }

        let code = self.code();
        match self {
            AppError::Database(_) | AppError::Internal(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, code, None)
            }
            AppError::NotFound(msg) => error_resp(StatusCode::NOT_FOUND, code, Some(msg)),
            AppError::Conflict(msg) => error_resp(StatusCode::CONFLICT, code, Some(msg)),
            AppError::InvalidInput(msg) => error_resp(StatusCode::BAD_REQUEST, code, Some(msg)),
            AppError::GatewayNotFound(name) => error_resp(
                StatusCode::BAD_REQUEST,
                code,
                Some(format!("payment gateway '{name}' is not available")),
            ),
            AppError::PaymentVerificationFailed(status) => error_resp(
                StatusCode::PAYMENT_REQUIRED,
                code,
                Some(format!("payment was not successful: {status}")),
            ),
            AppError::GatewayUnavailable { gateway, .. } => error_resp(
                StatusCode::BAD_GATEWAY,
                code,
                Some(format!("{gateway} is unavailable, try again later")),
            ),
            AppError::PaymentRejected { message, .. } => {
                error_resp(StatusCode::BAD_GATEWAY, code, Some(message))
            }
            AppError::InvalidSignature | AppError::Unauthorized => {
                error_resp(StatusCode::UNAUTHORIZED, code, None)
            }
            AppError::Forbidden => error_resp(StatusCode::FORBIDDEN, code, None),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
