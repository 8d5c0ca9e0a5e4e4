use chrono::NaiveDate;
use shared_types::{AppError, JailVisit};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

#[derive(Debug, Clone)]
pub struct NewJailVisit<'a> {
    pub case_number: &'a str,
    pub accused_name: &'a str,
    pub jail_id: Uuid,
    pub emirate: &'a str,
    pub counselor_id: Uuid,
    pub requested_date: NaiveDate,
    pub requested_time: &'a str,
    pub reason: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct JailVisitFilter {
    pub status: Option<String>,
    pub emirate: Option<String>,
    pub counselor_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

pub async fn create(pool: &Pool<Postgres>, visit: &NewJailVisit<'_>) -> Result<JailVisit, AppError> {
    sqlx::query_as::<_, JailVisit>(
        r#"
        INSERT INTO jail_visits
            (case_number, accused_name, jail_id, emirate, counselor_id,
             requested_date, requested_time, reason)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(visit.case_number)
    .bind(visit.accused_name)
    .bind(visit.jail_id)
    .bind(visit.emirate)
    .bind(visit.counselor_id)
    .bind(visit.requested_date)
    .bind(visit.requested_time)
    .bind(visit.reason)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<JailVisit>, AppError> {
    sqlx::query_as::<_, JailVisit>("SELECT * FROM jail_visits WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Newest requests first.
pub async fn list(pool: &Pool<Postgres>, filter: &JailVisitFilter) -> Result<Vec<JailVisit>, AppError> {
    sqlx::query_as::<_, JailVisit>(
        r#"
        SELECT * FROM jail_visits
        WHERE ($1::TEXT IS NULL OR status = $1)
          AND ($2::TEXT IS NULL OR emirate = $2)
          AND ($3::UUID IS NULL OR counselor_id = $3)
          AND ($4::DATE IS NULL OR requested_date >= $4)
          AND ($5::DATE IS NULL OR requested_date <= $5)
        ORDER BY created_at DESC
        "#,
    )
    .bind(filter.status.as_deref())
    .bind(filter.emirate.as_deref())
    .bind(filter.counselor_id)
    .bind(filter.start_date)
    .bind(filter.end_date)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn review(
    pool: &Pool<Postgres>,
    id: Uuid,
    status: &str,
    reviewer: Uuid,
    remarks: Option<&str>,
    rejection_reason: Option<&str>,
) -> Result<Option<JailVisit>, AppError> {
    sqlx::query_as::<_, JailVisit>(
        r#"
        UPDATE jail_visits SET
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
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM jail_visits WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
