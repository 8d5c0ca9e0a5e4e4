use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    parse_date_input, ApiResponse, AppError, CaseExpense, ErrorResponse, ExpenseRequest,
    MessageResponse,
};

use super::case::{load_case, parse_case_id};
use crate::auth::AuthUser;
use crate::repo;

fn parse_expense_date(raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(None),
        Some(d) => parse_date_input(d)
            .map(Some)
            .ok_or_else(|| AppError::bad_request(format!("Invalid date: {d}"))),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// GET /api/cases/{case_id}/expenses
#[utoipa::path(
    get,
    path = "/api/cases/{case_id}/expenses",
    params(("case_id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Expenses by date", body = ApiResponse<Vec<CaseExpense>>),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    tag = "case-expenses"
)]
pub async fn list_expenses(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(case_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CaseExpense>>>, AppError> {
    let case = load_case(&pool, parse_case_id(&case_id)?).await?;
    Ok(Json(ApiResponse::ok(
        repo::expense::list_for_case(&pool, case.id).await?,
    )))
}

/// POST /api/cases/{case_id}/expenses
#[utoipa::path(
    post,
    path = "/api/cases/{case_id}/expenses",
    params(("case_id" = String, Path, description = "Case UUID")),
    request_body = ExpenseRequest,
    responses(
        (status = 201, description = "Expense recorded", body = ApiResponse<CaseExpense>),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    tag = "case-expenses"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn add_expense(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(case_id): Path<String>,
    Json(body): Json<ExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CaseExpense>>), AppError> {
    let date = parse_expense_date(body.date.as_deref())?;
    let (Some(date), Some(label), Some(amount)) =
        (date, non_blank(body.expense.as_deref()), body.amount)
    else {
        return Err(AppError::bad_request("Date, expense, and amount are required"));
    };
    let case = load_case(&pool, parse_case_id(&case_id)?).await?;

    let expense = repo::expense::create(&pool, case.id, date, label, amount).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Expense added", expense)),
    ))
}

/// PUT /api/cases/{case_id}/expenses/{id}
#[utoipa::path(
    put,
    path = "/api/cases/{case_id}/expenses/{id}",
    params(
        ("case_id" = String, Path, description = "Case UUID"),
        ("id" = String, Path, description = "Expense UUID")
    ),
    request_body = ExpenseRequest,
    responses(
        (status = 200, description = "Expense updated", body = ApiResponse<CaseExpense>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "case-expenses"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_expense(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path((case_id, id)): Path<(String, String)>,
    Json(body): Json<ExpenseRequest>,
) -> Result<Json<ApiResponse<CaseExpense>>, AppError> {
    let case_id = parse_case_id(&case_id)?;
    let id = Uuid::parse_str(&id).map_err(|_| AppError::bad_request("Invalid UUID format"))?;
    let date = parse_expense_date(body.date.as_deref())?;

    let expense = repo::expense::update(
        &pool,
        case_id,
        id,
        date,
        non_blank(body.expense.as_deref()),
        body.amount,
    )
    .await?
    .ok_or_else(|| AppError::not_found("Expense not found"))?;

    Ok(Json(ApiResponse::with_message("Expense updated", expense)))
}

/// DELETE /api/cases/{case_id}/expenses/{id}
#[utoipa::path(
    delete,
    path = "/api/cases/{case_id}/expenses/{id}",
    params(
        ("case_id" = String, Path, description = "Case UUID"),
        ("id" = String, Path, description = "Expense UUID")
    ),
    responses(
        (status = 200, description = "Expense deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "case-expenses"
)]
pub async fn delete_expense(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path((case_id, id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    let case_id = parse_case_id(&case_id)?;
    let id = Uuid::parse_str(&id).map_err(|_| AppError::bad_request("Invalid UUID format"))?;
    if !repo::expense::delete(&pool, case_id, id).await? {
        return Err(AppError::not_found("Expense not found"));
    }
    Ok(Json(MessageResponse::new("Expense deleted")))
}
