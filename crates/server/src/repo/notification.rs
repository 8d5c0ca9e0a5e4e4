use serde_json::Value;
use shared_types::{AppError, Notification};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Store the outcome of one delivery attempt. `error` marks it failed.
pub async fn record(
    pool: &Pool<Postgres>,
    user_id: Option<Uuid>,
    kind: &str,
    message: &str,
    error: Option<&str>,
    metadata: Option<Value>,
) -> Result<Notification, AppError> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, type, message, status, sent_at, error_message, metadata)
        VALUES ($1, $2, $3,
                CASE WHEN $4::TEXT IS NULL THEN 'sent' ELSE 'failed' END,
                CASE WHEN $4::TEXT IS NULL THEN NOW() END,
                $4, $5)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .bind(message)
    .bind(error)
    .bind(metadata)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
