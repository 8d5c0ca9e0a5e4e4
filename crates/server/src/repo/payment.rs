//! Client payments and the office ledger of payments recorded against a case.

use chrono::{DateTime, Utc};
use shared_types::{AppError, CreatePaymentRequest, Payment};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::helpers;

pub async fn invoice_number_exists(pool: &Pool<Postgres>, number: &str) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM payments WHERE invoice_number = $1)")
        .bind(number)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn generate_unique_invoice_number(pool: &Pool<Postgres>) -> Result<String, AppError> {
    helpers::first_free_number(helpers::generate_invoice_number, |candidate| async move {
        invoice_number_exists(pool, &candidate).await
    })
    .await
}

/// A payment submitted by a client. Starts out pending.
pub async fn create(
    pool: &Pool<Postgres>,
    client_id: Uuid,
    req: &CreatePaymentRequest,
    amount: f64,
    invoice_number: &str,
) -> Result<Payment, AppError> {
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments
            (case_id, client_id, consultation_id, amount, currency, payment_method,
             status, transaction_id, invoice_number, invoice_date, notes)
        VALUES ($1, $2, $3, $4, COALESCE($5, 'AED'), $6, 'pending', $7, $8, NOW(), $9)
        RETURNING *
        "#,
    )
    .bind(req.case_id)
    .bind(client_id)
    .bind(req.consultation_id)
    .bind(amount)
    .bind(req.currency.as_deref())
    .bind(req.payment_method.as_deref())
    .bind(req.transaction_id.as_deref())
    .bind(invoice_number)
    .bind(req.notes.as_deref())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Newest first. `None` lists every client's payments.
pub async fn list(pool: &Pool<Postgres>, client_id: Option<Uuid>) -> Result<Vec<Payment>, AppError> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE ($1::UUID IS NULL OR client_id = $1)
        ORDER BY created_at DESC
        "#,
    )
    .bind(client_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list_for_case(pool: &Pool<Postgres>, case_id: Uuid) -> Result<Vec<Payment>, AppError> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE case_id = $1 ORDER BY created_at DESC",
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

// ── Case ledger ─────────────────────────────────────────────────────

/// One ledger line as stored in `payments`.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub invoice_date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub amount: Option<f64>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

/// Ledger payments of a case, latest invoice date first.
pub async fn ledger_for_case(pool: &Pool<Postgres>, case_id: Uuid) -> Result<Vec<Payment>, AppError> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT * FROM payments
        WHERE case_id = $1
        ORDER BY invoice_date DESC NULLS LAST, created_at DESC
        "#,
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Ledger payments are recorded by staff and count as completed immediately.
pub async fn create_ledger(
    conn: &mut PgConnection,
    case_id: Uuid,
    client_id: Uuid,
    invoice_number: &str,
    entry: &LedgerEntry,
) -> Result<Payment, AppError> {
    sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments
            (case_id, client_id, amount, payment_method, status, transaction_id,
             invoice_number, invoice_date, notes)
        VALUES ($1, $2, $3, $4, 'completed', $5, $6, COALESCE($7, NOW()), $8)
        RETURNING *
        "#,
    )
    .bind(case_id)
    .bind(client_id)
    .bind(entry.amount.unwrap_or(0.0))
    .bind(entry.payment_method.as_deref())
    .bind(entry.transaction_id.as_deref())
    .bind(invoice_number)
    .bind(entry.invoice_date)
    .bind(entry.notes.as_deref())
    .fetch_one(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update_ledger(
    conn: &mut PgConnection,
    case_id: Uuid,
    id: Uuid,
    entry: &LedgerEntry,
) -> Result<Option<Payment>, AppError> {
    sqlx::query_as::<_, Payment>(
        r#"
        UPDATE payments SET
            invoice_date   = COALESCE($3, invoice_date),
            payment_method = COALESCE($4, payment_method),
            amount         = COALESCE($5, amount),
            transaction_id = COALESCE($6, transaction_id),
            notes          = COALESCE($7, notes)
        WHERE id = $1 AND case_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(case_id)
    .bind(entry.invoice_date)
    .bind(entry.payment_method.as_deref())
    .bind(entry.amount)
    .bind(entry.transaction_id.as_deref())
    .bind(entry.notes.as_deref())
    .fetch_optional(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_ledger(conn: &mut PgConnection, case_id: Uuid, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM payments WHERE id = $1 AND case_id = $2")
        .bind(id)
        .bind(case_id)
        .execute(conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

/// `paid_amount` is the sum of completed payments; the remainder is what is
/// still owed against the estimate.
pub async fn recompute_case_totals(conn: &mut PgConnection, case_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE cases SET
            paid_amount      = totals.paid,
            remaining_amount = cases.estimated_cost - totals.paid
        FROM (
            SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION AS paid
            FROM payments
            WHERE case_id = $1 AND status = 'completed'
        ) AS totals
        WHERE cases.id = $1
        "#,
    )
    .bind(case_id)
    .execute(conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Sum of completed payments made by a client.
pub async fn total_paid_by_client(pool: &Pool<Postgres>, client_id: Uuid) -> Result<f64, AppError> {
    sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION
        FROM payments
        WHERE client_id = $1 AND status = 'completed'
        "#,
    )
    .bind(client_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
