use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::jwt::{self, Claims},
};

/// Caller authenticated by a bearer access token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Caller whose token carries the admin role.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: Uuid,
}

async fn bearer_claims(parts: &mut Parts, state: &AppState) -> Result<Claims, AppError> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

    jwt::verify(bearer.token(), &state.config.jwt_secret)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state).await?;
        Ok(AuthUser {
            user_id: claims.user_id()?,
        })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state).await?;
        let user_id = claims.user_id()?;
        if !claims.is_admin() {
            tracing::warn!(user_id = %user_id, "Non-admin attempted an admin route");
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser { user_id })
    }
}
