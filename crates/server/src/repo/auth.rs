//! Phone OTP sessions and admin-approved password reset requests.

use chrono::{DateTime, Utc};
use shared_types::{AppError, PasswordReset};
use sqlx::{PgExecutor, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

pub const OTP_TTL_SECONDS: i64 = 600;
pub const RESET_REQUEST_TTL_HOURS: i32 = 24;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub phone: String,
    pub otp_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Store a new OTP session. Only the SHA-256 of the code is kept.
pub async fn create_otp_session(
    pool: &Pool<Postgres>,
    user_id: Uuid,
    phone: &str,
    otp_hash: &str,
) -> Result<OtpSession, AppError> {
    sqlx::query_as::<_, OtpSession>(
        r#"
        INSERT INTO otp_sessions (session_id, user_id, phone, otp_hash, expires_at)
        VALUES ($1, $2, $3, $4, NOW() + make_interval(secs => $5))
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(phone)
    .bind(otp_hash)
    .bind(OTP_TTL_SECONDS as f64)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_otp_session(
    pool: &Pool<Postgres>,
    session_id: Uuid,
) -> Result<Option<OtpSession>, AppError> {
    sqlx::query_as::<_, OtpSession>("SELECT * FROM otp_sessions WHERE session_id = $1")
        .bind(session_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_otp_session(pool: &Pool<Postgres>, session_id: Uuid) -> Result<(), AppError> {
    sqlx::query("DELETE FROM otp_sessions WHERE session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

// ── Password reset requests ─────────────────────────────────────────

pub async fn has_open_reset_request(pool: &Pool<Postgres>, user_id: Uuid) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM password_resets
            WHERE user_id = $1 AND status = 'pending' AND expires_at > NOW()
        )
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn create_reset_request(
    pool: &Pool<Postgres>,
    user_id: Uuid,
) -> Result<PasswordReset, AppError> {
    sqlx::query_as::<_, PasswordReset>(
        r#"
        INSERT INTO password_resets (user_id, expires_at)
        VALUES ($1, NOW() + make_interval(hours => $2))
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(RESET_REQUEST_TTL_HOURS)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Pending requests, newest first.
pub async fn pending_reset_requests(pool: &Pool<Postgres>) -> Result<Vec<PasswordReset>, AppError> {
    sqlx::query_as::<_, PasswordReset>(
        r#"
        SELECT * FROM password_resets
        WHERE status = 'pending'
        ORDER BY request_date DESC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_reset_request(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<PasswordReset>, AppError> {
    sqlx::query_as::<_, PasswordReset>("SELECT * FROM password_resets WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Close a pending request. Returns `None` when it was already processed.
pub async fn resolve_reset_request<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    status: &str,
    approver: Uuid,
    rejection_reason: Option<&str>,
) -> Result<Option<PasswordReset>, AppError> {
    sqlx::query_as::<_, PasswordReset>(
        r#"
        UPDATE password_resets SET
            status           = $2,
            approved_by      = $3,
            approved_date    = NOW(),
            rejection_reason = $4
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(approver)
    .bind(rejection_reason)
    .fetch_optional(executor)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
