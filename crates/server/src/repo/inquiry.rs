use chrono::NaiveDate;
use serde_json::Value;
use shared_types::{AppError, CaseInquiry, InquiryForm};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Unknown urgency or preference values fall back to the column defaults.
pub async fn create(
    pool: &Pool<Postgres>,
    form: &InquiryForm,
    preferred_date: Option<NaiveDate>,
    documents: Value,
) -> Result<CaseInquiry, AppError> {
    sqlx::query_as::<_, CaseInquiry>(
        r#"
        INSERT INTO case_inquiries
            (first_name, last_name, email, phone, emirates_id, case_type, title,
             description, urgency, consultation_preference, preferred_date, documents)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                COALESCE($9, 'medium'), COALESCE($10, 'office'), $11, $12)
        RETURNING *
        "#,
    )
    .bind(trimmed(&form.first_name))
    .bind(trimmed(&form.last_name))
    .bind(trimmed(&form.email).map(str::to_lowercase))
    .bind(trimmed(&form.phone))
    .bind(trimmed(&form.emirates_id))
    .bind(trimmed(&form.case_type))
    .bind(trimmed(&form.title))
    .bind(trimmed(&form.description))
    .bind(trimmed(&form.urgency).filter(|u| shared_types::INQUIRY_URGENCIES.contains(u)))
    .bind(
        trimmed(&form.consultation_preference)
            .filter(|p| shared_types::CONSULTATION_PREFERENCES.contains(p)),
    )
    .bind(preferred_date)
    .bind(documents)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(pool: &Pool<Postgres>) -> Result<Vec<CaseInquiry>, AppError> {
    sqlx::query_as::<_, CaseInquiry>("SELECT * FROM case_inquiries ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    status: Option<&str>,
    admin_notes: Option<&str>,
) -> Result<Option<CaseInquiry>, AppError> {
    sqlx::query_as::<_, CaseInquiry>(
        r#"
        UPDATE case_inquiries SET
            status      = COALESCE($2, status),
            admin_notes = COALESCE($3, admin_notes)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(admin_notes)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM case_inquiries WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
