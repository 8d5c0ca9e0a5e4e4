use std::collections::HashMap;

use shared_types::{AppError, ClientCaseLine, Message, MessageClient};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Recent cases shown next to a message sender.
const RECENT_CASES: i64 = 5;

#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub client_id: Option<Uuid>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
}

pub async fn create(
    pool: &Pool<Postgres>,
    client_id: Uuid,
    subject: &str,
    message: &str,
    priority: &str,
) -> Result<Message, AppError> {
    sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (client_id, subject, message, priority, status, is_read, client_read)
        VALUES ($1, $2, $3, $4, 'pending', FALSE, TRUE)
        RETURNING *
        "#,
    )
    .bind(client_id)
    .bind(subject)
    .bind(message)
    .bind(priority)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Message>, AppError> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(pool: &Pool<Postgres>, filter: &MessageFilter) -> Result<Vec<Message>, AppError> {
    let pattern = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));
    sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM messages
        WHERE ($1::UUID IS NULL OR client_id = $1)
          AND ($2::TEXT IS NULL OR status = $2)
          AND ($3::TEXT IS NULL OR priority = $3)
          AND ($4::TEXT IS NULL OR subject ILIKE $4 OR message ILIKE $4)
        ORDER BY created_at DESC
        "#,
    )
    .bind(filter.client_id)
    .bind(filter.status.as_deref())
    .bind(filter.priority.as_deref())
    .bind(pattern.as_deref())
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Messages the office has not opened yet.
pub async fn unread_by_admin(pool: &Pool<Postgres>) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE NOT is_read")
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Replies a client has not seen yet.
pub async fn unread_replies(pool: &Pool<Postgres>, client_id: Uuid) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM messages
        WHERE client_id = $1 AND status = 'replied' AND NOT client_read
        "#,
    )
    .bind(client_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn mark_read_by_admin(pool: &Pool<Postgres>, id: Uuid) -> Result<Message, AppError> {
    sqlx::query_as::<_, Message>("UPDATE messages SET is_read = TRUE WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn mark_read_by_client(pool: &Pool<Postgres>, id: Uuid) -> Result<Message, AppError> {
    sqlx::query_as::<_, Message>("UPDATE messages SET client_read = TRUE WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn reply(
    pool: &Pool<Postgres>,
    id: Uuid,
    admin_reply: &str,
    replied_by: Uuid,
) -> Result<Option<Message>, AppError> {
    sqlx::query_as::<_, Message>(
        r#"
        UPDATE messages SET
            admin_reply = $2,
            replied_by  = $3,
            replied_at  = NOW(),
            status      = 'replied',
            is_read     = TRUE,
            client_read = FALSE
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(admin_reply)
    .bind(replied_by)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn set_status(pool: &Pool<Postgres>, id: Uuid, status: &str) -> Result<Option<Message>, AppError> {
    sqlx::query_as::<_, Message>("UPDATE messages SET status = $2 WHERE id = $1 RETURNING *")
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM messages WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

/// Sender details with their five most recent cases.
pub async fn clients_with_cases(
    pool: &Pool<Postgres>,
    client_ids: &[Uuid],
) -> Result<HashMap<Uuid, MessageClient>, AppError> {
    let users: Vec<(Uuid, String, String, String, Option<String>)> = sqlx::query_as(
        "SELECT id, name, email, phone, client_number FROM users WHERE id = ANY($1)",
    )
    .bind(client_ids)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let lines = sqlx::query_as::<_, ClientCaseLine>(
        r#"
        SELECT client_id, case_number, case_type, status, registration_date
        FROM (
            SELECT *, ROW_NUMBER() OVER (PARTITION BY client_id ORDER BY created_at DESC) AS rn
            FROM cases
            WHERE client_id = ANY($1)
        ) ranked
        WHERE rn <= $2
        ORDER BY registration_date DESC
        "#,
    )
    .bind(client_ids)
    .bind(RECENT_CASES)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let mut cases: HashMap<Uuid, Vec<ClientCaseLine>> = HashMap::new();
    for line in lines {
        cases.entry(line.client_id).or_default().push(line);
    }

    Ok(users
        .into_iter()
        .map(|(id, name, email, phone, client_number)| {
            let client = MessageClient {
                id,
                name,
                email,
                phone,
                client_number,
                cases: cases.remove(&id).unwrap_or_default(),
            };
            (id, client)
        })
        .collect())
}
