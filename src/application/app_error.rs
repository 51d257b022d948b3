use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Payment gateway not found: {0}")]
    GatewayNotFound(String),

    #[error("Payment verification failed: {0}")]
    PaymentVerificationFailed(String),

    /// Transport-level failure talking to a payment gateway. Safe to retry.
    #[error("{gateway} {operation} unavailable: {message}")]
    GatewayUnavailable {
        gateway: String,
        operation: &'static str,
        message: String,
    },

    /// The gateway answered and refused the operation. Retrying will not help.
    #[error("{gateway} rejected {operation}: {message}")]
    PaymentRejected {
        gateway: String,
        operation: &'static str,
        message: String,
    },

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the same call could succeed if repeated later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::GatewayUnavailable { .. } | AppError::Internal(_)
        )
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::InvalidInput(_) => ErrorCode::InvalidInput,
            AppError::GatewayNotFound(_) => ErrorCode::GatewayNotFound,
            AppError::PaymentVerificationFailed(_) => ErrorCode::PaymentVerificationFailed,
            AppError::GatewayUnavailable { .. } => ErrorCode::GatewayUnavailable,
            AppError::PaymentRejected { .. } => ErrorCode::PaymentRejected,
            AppError::InvalidSignature => ErrorCode::InvalidSignature,
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::Forbidden => ErrorCode::Forbidden,
            AppError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    NotFound,
    Conflict,
    InvalidInput,
    GatewayNotFound,
    PaymentVerificationFailed,
    GatewayUnavailable,
    PaymentRejected,
    InvalidSignature,
    Unauthorized,
    Forbidden,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::GatewayNotFound => "GATEWAY_NOT_FOUND",
            ErrorCode::PaymentVerificationFailed => "PAYMENT_VERIFICATION_FAILED",
            ErrorCode::GatewayUnavailable => "GATEWAY_UNAVAILABLE",
            ErrorCode::PaymentRejected => "PAYMENT_REJECTED",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
