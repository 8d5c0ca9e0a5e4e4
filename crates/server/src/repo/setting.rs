use serde_json::Value;
use shared_types::{AppError, Setting};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

pub async fn list(pool: &Pool<Postgres>) -> Result<Vec<Setting>, AppError> {
    sqlx::query_as::<_, Setting>("SELECT * FROM settings ORDER BY category NULLS LAST, key")
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_key(pool: &Pool<Postgres>, key: &str) -> Result<Option<Setting>, AppError> {
    sqlx::query_as::<_, Setting>("SELECT * FROM settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Insert or replace the value; category and description are kept when omitted.
pub async fn upsert(
    pool: &Pool<Postgres>,
    key: &str,
    value: &Value,
    category: Option<&str>,
    description: Option<&str>,
    updated_by: Uuid,
) -> Result<Setting, AppError> {
    sqlx::query_as::<_, Setting>(
        r#"
        INSERT INTO settings (key, value, category, description, updated_by)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (key) DO UPDATE SET
            value       = EXCLUDED.value,
            category    = COALESCE(EXCLUDED.category, settings.category),
            description = COALESCE(EXCLUDED.description, settings.description),
            updated_by  = EXCLUDED.updated_by
        RETURNING *
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(category)
    .bind(description)
    .bind(updated_by)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
