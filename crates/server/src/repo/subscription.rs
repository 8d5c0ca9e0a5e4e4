use shared_types::{AppError, Subscription};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

pub async fn find_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<Subscription>, AppError> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn create(
    pool: &Pool<Postgres>,
    email: &str,
    user_id: Option<Uuid>,
    source: Option<&str>,
) -> Result<Subscription, AppError> {
    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (email, user_id, source)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(user_id)
    .bind(source)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Reactivate; an existing user link or source wins over the new one.
pub async fn resubscribe(
    pool: &Pool<Postgres>,
    id: i64,
    user_id: Option<Uuid>,
    source: Option<&str>,
) -> Result<Subscription, AppError> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions SET
            status  = 'subscribed',
            user_id = COALESCE(user_id, $2),
            source  = COALESCE(source, $3)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(source)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Matches by id when given, otherwise by email.
pub async fn unsubscribe(
    pool: &Pool<Postgres>,
    id: Option<i64>,
    email: Option<&str>,
) -> Result<Option<Subscription>, AppError> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions SET status = 'unsubscribed'
        WHERE CASE WHEN $1::BIGINT IS NOT NULL THEN id = $1 ELSE email = $2 END
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(pool: &Pool<Postgres>) -> Result<Vec<Subscription>, AppError> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}
