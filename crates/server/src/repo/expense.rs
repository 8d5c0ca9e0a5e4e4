use chrono::NaiveDate;
use shared_types::{AppError, CaseExpense};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Latest expense date first.
pub async fn list_for_case(pool: &Pool<Postgres>, case_id: Uuid) -> Result<Vec<CaseExpense>, AppError> {
    sqlx::query_as::<_, CaseExpense>(
        "SELECT * FROM case_expenses WHERE case_id = $1 ORDER BY date DESC, created_at DESC",
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn create(
    pool: &Pool<Postgres>,
    case_id: Uuid,
    date: NaiveDate,
    expense: &str,
    amount: f64,
) -> Result<CaseExpense, AppError> {
    sqlx::query_as::<_, CaseExpense>(
        r#"
        INSERT INTO case_expenses (case_id, date, expense, amount)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(case_id)
    .bind(date)
    .bind(expense)
    .bind(amount)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update(
    pool: &Pool<Postgres>,
    case_id: Uuid,
    id: Uuid,
    date: Option<NaiveDate>,
    expense: Option<&str>,
    amount: Option<f64>,
) -> Result<Option<CaseExpense>, AppError> {
    sqlx::query_as::<_, CaseExpense>(
        r#"
        UPDATE case_expenses SET
            date    = COALESCE($3, date),
            expense = COALESCE($4, expense),
            amount  = COALESCE($5, amount)
        WHERE id = $1 AND case_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(case_id)
    .bind(date)
    .bind(expense)
    .bind(amount)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, case_id: Uuid, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM case_expenses WHERE id = $1 AND case_id = $2")
        .bind(id)
        .bind(case_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
