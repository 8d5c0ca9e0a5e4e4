use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    parse_date_input, ApiResponse, AppError, CasePaymentRequest, ErrorResponse, MessageResponse,
    Payment,
};

use super::case::{load_case, parse_case_id};
use crate::auth::AuthUser;
use crate::error_convert::SqlxErrorExt;
use crate::repo;
use crate::repo::payment::LedgerEntry;

fn invoice_date(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(None),
        Some(d) => parse_date_input(d)
            .map(|day| Some(day.and_time(NaiveTime::MIN).and_utc()))
            .ok_or_else(|| AppError::bad_request(format!("Invalid date: {d}"))),
    }
}

/// Map a ledger request onto payment columns. The note is only rebuilt when
/// one of its parts is supplied so partial updates keep the stored note.
fn ledger_entry(body: &CasePaymentRequest) -> Result<LedgerEntry, AppError> {
    let has_note = body.being.is_some() || body.bank.is_some() || body.cheque_date.is_some();
    Ok(LedgerEntry {
        invoice_date: invoice_date(body.date.as_deref())?,
        payment_method: body
            .payment_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string),
        amount: body.amount,
        transaction_id: body.cheque_number.clone(),
        notes: has_note.then(|| body.ledger_note()),
    })
}

fn parse_payment_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

/// GET /api/cases/{case_id}/payments
#[utoipa::path(
    get,
    path = "/api/cases/{case_id}/payments",
    params(("case_id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Ledger by invoice date", body = ApiResponse<Vec<Payment>>),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    tag = "case-payments"
)]
pub async fn list_case_payments(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(case_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Payment>>>, AppError> {
    let case = load_case(&pool, parse_case_id(&case_id)?).await?;
    Ok(Json(ApiResponse::ok(
        repo::payment::ledger_for_case(&pool, case.id).await?,
    )))
}

/// POST /api/cases/{case_id}/payments
#[utoipa::path(
    post,
    path = "/api/cases/{case_id}/payments",
    params(("case_id" = String, Path, description = "Case UUID")),
    request_body = CasePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = ApiResponse<Payment>),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    tag = "case-payments"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn add_case_payment(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(case_id): Path<String>,
    Json(body): Json<CasePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Payment>>), AppError> {
    let mut entry = ledger_entry(&body)?;
    if entry.invoice_date.is_none() || entry.payment_method.is_none() || entry.amount.is_none() {
        return Err(AppError::bad_request(
            "Date, payment type, and amount are required",
        ));
    }
    entry.notes = Some(body.ledger_note());
    let case = load_case(&pool, parse_case_id(&case_id)?).await?;
    let invoice_number = repo::payment::generate_unique_invoice_number(&pool).await?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let payment =
        repo::payment::create_ledger(&mut tx, case.id, case.client_id, &invoice_number, &entry)
            .await?;
    repo::payment::recompute_case_totals(&mut tx, case.id).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(case_id = %case.id, invoice = %invoice_number, "Ledger payment recorded");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Payment added", payment)),
    ))
}

/// PUT /api/cases/{case_id}/payments/{id}
#[utoipa::path(
    put,
    path = "/api/cases/{case_id}/payments/{id}",
    params(
        ("case_id" = String, Path, description = "Case UUID"),
        ("id" = String, Path, description = "Payment UUID")
    ),
    request_body = CasePaymentRequest,
    responses(
        (status = 200, description = "Payment updated", body = ApiResponse<Payment>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "case-payments"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_case_payment(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path((case_id, id)): Path<(String, String)>,
    Json(body): Json<CasePaymentRequest>,
) -> Result<Json<ApiResponse<Payment>>, AppError> {
    let case_id = parse_case_id(&case_id)?;
    let id = parse_payment_id(&id)?;
    let entry = ledger_entry(&body)?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let payment = repo::payment::update_ledger(&mut tx, case_id, id, &entry)
        .await?
        .ok_or_else(|| AppError::not_found("Payment not found"))?;
    repo::payment::recompute_case_totals(&mut tx, case_id).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    Ok(Json(ApiResponse::with_message("Payment updated", payment)))
}

/// DELETE /api/cases/{case_id}/payments/{id}
#[utoipa::path(
    delete,
    path = "/api/cases/{case_id}/payments/{id}",
    params(
        ("case_id" = String, Path, description = "Case UUID"),
        ("id" = String, Path, description = "Payment UUID")
    ),
    responses(
        (status = 200, description = "Payment deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "case-payments"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_case_payment(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path((case_id, id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    let case_id = parse_case_id(&case_id)?;
    let id = parse_payment_id(&id)?;

    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    if !repo::payment::delete_ledger(&mut tx, case_id, id).await? {
        return Err(AppError::not_found("Payment not found"));
    }
    repo::payment::recompute_case_totals(&mut tx, case_id).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    Ok(Json(MessageResponse::new("Payment deleted")))
}
