use chrono::NaiveDate;
use shared_types::{AppError, CourtQuotation, CreateQuotationRequest};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

#[derive(Debug, Clone, Default)]
pub struct QuotationFilter {
    pub status: Option<String>,
    pub emirate: Option<String>,
    pub created_by: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn create(
    pool: &Pool<Postgres>,
    req: &CreateQuotationRequest,
    fee_amount: f64,
    created_by: Uuid,
) -> Result<CourtQuotation, AppError> {
    sqlx::query_as::<_, CourtQuotation>(
        r#"
        INSERT INTO court_quotations
            (case_number, emirate, court, client_name, client_contact, fee_amount,
             notes, attachments, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(trimmed(&req.case_number))
    .bind(trimmed(&req.emirate))
    .bind(trimmed(&req.court))
    .bind(trimmed(&req.client_name))
    .bind(trimmed(&req.client_contact))
    .bind(fee_amount)
    .bind(trimmed(&req.notes))
    .bind(req.attachments.clone())
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<CourtQuotation>, AppError> {
    sqlx::query_as::<_, CourtQuotation>("SELECT * FROM court_quotations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Newest first. The date range bounds the creation day.
pub async fn list(
    pool: &Pool<Postgres>,
    filter: &QuotationFilter,
) -> Result<Vec<CourtQuotation>, AppError> {
    sqlx::query_as::<_, CourtQuotation>(
        r#"
        SELECT * FROM court_quotations
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::TEXT IS NULL OR emirate = $2)
          AND ($3::UUID IS NULL OR created_by = $3)
          AND ($4::DATE IS NULL OR created_at::DATE >= $4)
          AND ($5::DATE IS NULL OR created_at::DATE <= $5)
        ORDER BY created_at DESC
        "#,
    )
    .bind(filter.status.as_deref())
    .bind(filter.emirate.as_deref())
    .bind(filter.created_by)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn review(
    conn: &mut PgConnection,
    id: Uuid,
    status: &str,
    reviewer: Uuid,
    remarks: Option<&str>,
    rejection_reason: Option<&str>,
) -> Result<Option<CourtQuotation>, AppError> {
    sqlx::query_as::<_, CourtQuotation>(
        r#"
        UPDATE court_quotations SET
            status           = $2,
            approved_by      = $3,
            approved_date    = NOW(),
            remarks          = COALESCE($4, remarks),
            rejection_reason = $5
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(reviewer)
    .bind(remarks)
    .bind(rejection_reason)
    .fetch_optional(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM court_quotations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
