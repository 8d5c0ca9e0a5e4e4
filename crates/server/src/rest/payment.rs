use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{ApiResponse, AppError, CreatePaymentRequest, ErrorResponse, Payment, Role};

use super::case::parse_case_id;
use crate::auth::AuthUser;
use crate::repo;

/// POST /api/payments
#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Invoice created", body = ApiResponse<Payment>),
        (status = 400, description = "Missing amount", body = ErrorResponse)
    ),
    tag = "payments"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_payment(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Payment>>), AppError> {
    let amount = body
        .amount
        .filter(|a| *a > 0.0)
        .ok_or_else(|| AppError::bad_request("A positive amount is required"))?;
    let invoice_number = repo::payment::generate_unique_invoice_number(&pool).await?;
    let payment =
        repo::payment::create(&pool, caller.id(), &body, amount, &invoice_number).await?;

    tracing::info!(payment_id = %payment.id, invoice = %invoice_number, "Payment created");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Payment created", payment)),
    ))
}

/// GET /api/payments
#[utoipa::path(
    get,
    path = "/api/payments",
    responses(
        (status = 200, description = "Payments, newest first", body = ApiResponse<Vec<Payment>>)
    ),
    tag = "payments"
)]
pub async fn list_payments(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<Payment>>>, AppError> {
    let client_id = (caller.role == Role::Client).then(|| caller.id());
    Ok(Json(ApiResponse::ok(
        repo::payment::list(&pool, client_id).await?,
    )))
}

/// GET /api/payments/case/{case_id}
#[utoipa::path(
    get,
    path = "/api/payments/case/{case_id}",
    params(("case_id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Payments for the case", body = ApiResponse<Vec<Payment>>)
    ),
    tag = "payments"
)]
pub async fn list_payments_for_case(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(case_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Payment>>>, AppError> {
    Ok(Json(ApiResponse::ok(
        repo::payment::list_for_case(&pool, parse_case_id(&case_id)?).await?,
    )))
}
