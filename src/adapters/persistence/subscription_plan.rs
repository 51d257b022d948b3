use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::plan_catalog::{NewPlan, PlanChanges, SubscriptionPlanRepo},
    domain::entities::{money::Amount, subscription_plan::SubscriptionPlan},
};

fn row_to_plan(row: &sqlx::postgres::PgRow) -> SubscriptionPlan {
    SubscriptionPlan {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price: Amount::from_minor_units(row.get("price_minor")),
        currency: row.get("currency"),
        duration_days: row.get("duration_days"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, name, description, price_minor, currency, duration_days, is_active,
    created_at, updated_at, deleted_at
"#;

#[async_trait]
impl SubscriptionPlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE id = $1 AND deleted_at IS NULL",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn get_any_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn list_active(&self) -> AppResult<Vec<SubscriptionPlan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE is_active AND deleted_at IS NULL ORDER BY price_minor ASC, created_at ASC",
            SELECT_COLS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_plan).collect())
    }

    async fn create(&self, plan: &NewPlan) -> AppResult<SubscriptionPlan> {
        let now = Utc::now();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscription_plans
                (id, name, description, price_minor, currency, duration_days, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $7)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price.minor_units())
        .bind(&plan.currency)
        .bind(plan.duration_days)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_plan(&row))
    }

    async fn update(&self, id: Uuid, changes: &PlanChanges) -> AppResult<Option<SubscriptionPlan>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscription_plans SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_minor = COALESCE($4, price_minor),
                duration_days = COALESCE($5, duration_days),
                is_active = COALESCE($6, is_active),
                updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.price.map(|p| p.minor_units()))
        .bind(changes.duration_days)
        .bind(changes.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn soft_delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE subscription_plans SET deleted_at = now(), updated_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
