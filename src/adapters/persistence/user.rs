use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_orchestrator::UserDirectory,
};

#[async_trait]
impl UserDirectory for PostgresPersistence {
    async fn get_email(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let email = sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(email)
    }
}
