use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    parse_date_input, ApiResponse, AppError, CourtQuotation, CreateQuotationRequest,
    ErrorResponse, MessageResponse, QuotationListParams, QuotationView, ReviewRequest, Role,
    QUOTATION_REVIEW_STATUSES,
};

use super::case::author;
use super::jail_visit::check_deletable;
use crate::auth::{roles, AuthUser, Authorized};
use crate::error_convert::SqlxErrorExt;
use crate::repo;
use crate::repo::quotation::QuotationFilter;
use crate::repo::tracking::TrackingEntry;

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

async fn load_quotation(pool: &Pool<Postgres>, id: &str) -> Result<CourtQuotation, AppError> {
    repo::quotation::find_by_id(pool, parse_id(id)?)
        .await?
        .ok_or_else(|| AppError::not_found("Quotation not found"))
}

async fn views(
    pool: &Pool<Postgres>,
    quotations: Vec<CourtQuotation>,
) -> Result<Vec<QuotationView>, AppError> {
    let user_ids: Vec<Uuid> = quotations
        .iter()
        .flat_map(|q| [Some(q.created_by), q.approved_by])
        .flatten()
        .collect();
    let users = repo::user::summaries_by_ids(pool, &user_ids).await?;

    Ok(quotations
        .into_iter()
        .map(|quotation| QuotationView {
            creator: author(repo::user::pick(&users, Some(quotation.created_by))),
            approver: author(repo::user::pick(&users, quotation.approved_by)),
            quotation,
        })
        .collect())
}

/// POST /api/court-quotations
#[utoipa::path(
    post,
    path = "/api/court-quotations",
    request_body = CreateQuotationRequest,
    responses(
        (status = 201, description = "Quotation submitted", body = ApiResponse<CourtQuotation>),
        (status = 400, description = "Missing fields", body = ErrorResponse)
    ),
    tag = "court-quotations"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_quotation(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CourtQuotation>>), AppError> {
    let complete = present(&body.case_number)
        && present(&body.emirate)
        && present(&body.court)
        && present(&body.client_name);
    let Some(fee_amount) = body.fee_amount.filter(|_| complete) else {
        return Err(AppError::bad_request("All required fields must be filled"));
    };

    let quotation = repo::quotation::create(&pool, &body, fee_amount, caller.id()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Court quotation created successfully",
            quotation,
        )),
    ))
}

/// GET /api/court-quotations
#[utoipa::path(
    get,
    path = "/api/court-quotations",
    params(QuotationListParams),
    responses((status = 200, description = "Quotations, newest first", body = ApiResponse<Vec<QuotationView>>)),
    tag = "court-quotations"
)]
pub async fn list_quotations(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Query(params): Query<QuotationListParams>,
) -> Result<Json<ApiResponse<Vec<QuotationView>>>, AppError> {
    let created_by = if caller.role == Role::Counsellor {
        Some(caller.id())
    } else {
        params.created_by
    };
    let filter = QuotationFilter {
        status: params.status.filter(|s| !s.is_empty()),
        emirate: params.emirate.filter(|e| !e.is_empty() && e != "all"),
        created_by,
        start_date: params.start_date.as_deref().and_then(parse_date_input),
        end_date: params.end_date.as_deref().and_then(parse_date_input),
    };
    let quotations = repo::quotation::list(&pool, &filter).await?;
    Ok(Json(ApiResponse::ok(views(&pool, quotations).await?)))
}

/// GET /api/court-quotations/{id}
#[utoipa::path(
    get,
    path = "/api/court-quotations/{id}",
    params(("id" = String, Path, description = "Quotation UUID")),
    responses(
        (status = 200, description = "Quotation", body = ApiResponse<QuotationView>),
        (status = 403, description = "Another counsellor's quotation", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "court-quotations"
)]
pub async fn get_quotation(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<QuotationView>>, AppError> {
    let quotation = load_quotation(&pool, &id).await?;
    if caller.role == Role::Counsellor && quotation.created_by != caller.id() {
        return Err(AppError::forbidden("Not authorized to view this quotation"));
    }
    let view = views(&pool, vec![quotation])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Quotation not found"))?;
    Ok(Json(ApiResponse::ok(view)))
}

/// PUT /api/court-quotations/{id}/status
///
/// Approval starts work on the matching case: it moves to `in_progress`
/// with the approver as lawyer, and the change lands in the case history.
#[utoipa::path(
    put,
    path = "/api/court-quotations/{id}/status",
    params(("id" = String, Path, description = "Quotation UUID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ApiResponse<CourtQuotation>),
        (status = 400, description = "Invalid status", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "court-quotations"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn review_quotation(
    State(pool): State<Pool<Postgres>>,
    Authorized(caller): Authorized<{ roles::ADMIN_OR_LAWYER }>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<CourtQuotation>>, AppError> {
    let status = body
        .status
        .as_deref()
        .filter(|s| QUOTATION_REVIEW_STATUSES.contains(s))
        .ok_or_else(|| AppError::bad_request("Invalid status"))?;
    let quotation = load_quotation(&pool, &id).await?;
    let case = if status == "approved" {
        repo::case::find_by_number(&pool, &quotation.case_number).await?
    } else {
        None
    };

    let rejection_reason = body.effective_rejection_reason();
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let updated = repo::quotation::review(
        &mut tx,
        quotation.id,
        status,
        caller.id(),
        body.remarks.as_deref(),
        rejection_reason.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Quotation not found"))?;

    if let Some(case) = case {
        repo::case::start_progress(&mut tx, case.id, caller.id()).await?;
        let entry = TrackingEntry::change(
            "status_change",
            Some(case.status.clone()),
            Some("in_progress".to_string()),
            format!(
                "Status changed from {} to in_progress after court quotation approval",
                case.status
            ),
        );
        repo::tracking::append(&mut tx, case.id, caller.id(), &entry).await?;
    }
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    tracing::info!(quotation_id = %updated.id, status, "court quotation reviewed");
    Ok(Json(ApiResponse::with_message(
        "Court quotation status updated successfully",
        updated,
    )))
}

/// DELETE /api/court-quotations/{id}
#[utoipa::path(
    delete,
    path = "/api/court-quotations/{id}",
    params(("id" = String, Path, description = "Quotation UUID")),
    responses(
        (status = 200, description = "Quotation deleted", body = MessageResponse),
        (status = 400, description = "Already processed", body = ErrorResponse),
        (status = 403, description = "Another counsellor's quotation", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "court-quotations"
)]
#[tracing::instrument(skip(pool, caller))]
pub async fn delete_quotation(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let quotation = load_quotation(&pool, &id).await?;
    check_deletable(
        &caller,
        &quotation.status,
        quotation.created_by,
        "Cannot delete processed quotations",
        "Not authorized to delete this quotation",
    )?;

    repo::quotation::delete(&pool, quotation.id).await?;
    Ok(Json(MessageResponse::new("Quotation deleted successfully")))
}
