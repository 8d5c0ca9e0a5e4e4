use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    ApiResponse, AppError, CaseTracking, ErrorResponse, MessageResponse, TrackingEntryRequest,
    TrackingView,
};

use super::case::{load_case, parse_case_id};
use crate::auth::AuthUser;
use crate::repo;
use crate::repo::tracking::TrackingEntry;

fn parse_record_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

/// GET /api/cases/{case_id}/tracking
#[utoipa::path(
    get,
    path = "/api/cases/{case_id}/tracking",
    params(("case_id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Tracking history, newest first", body = ApiResponse<Vec<TrackingView>>),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    tag = "case-tracking"
)]
pub async fn list_tracking(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(case_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TrackingView>>>, AppError> {
    let case = load_case(&pool, parse_case_id(&case_id)?).await?;
    let records = repo::tracking::list_for_case(&pool, case.id).await?;

    let ids: Vec<Uuid> = records.iter().map(|r| r.user_id).collect();
    let users = repo::user::summaries_by_ids(&pool, &ids).await?;
    let views = records
        .into_iter()
        .map(|record| TrackingView {
            user: repo::user::pick(&users, Some(record.user_id)).map(|mut u| {
                u.phone = None;
                u.role = None;
                u
            }),
            record,
        })
        .collect();

    Ok(Json(ApiResponse::ok(views)))
}

/// POST /api/cases/{case_id}/tracking
#[utoipa::path(
    post,
    path = "/api/cases/{case_id}/tracking",
    params(("case_id" = String, Path, description = "Case UUID")),
    request_body = TrackingEntryRequest,
    responses(
        (status = 201, description = "Manual entry added", body = ApiResponse<CaseTracking>),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    tag = "case-tracking"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn add_tracking(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(case_id): Path<String>,
    Json(body): Json<TrackingEntryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CaseTracking>>), AppError> {
    let case = load_case(&pool, parse_case_id(&case_id)?).await?;
    let entry = TrackingEntry::manual(&body, &caller.user.name);
    let record = repo::tracking::record(&pool, case.id, caller.id(), &entry).await?;

    tracing::info!(case_id = %case.id, change_number = record.change_number, "Tracking entry added");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Tracking record added", record)),
    ))
}

/// PUT /api/cases/{case_id}/tracking/{id}
#[utoipa::path(
    put,
    path = "/api/cases/{case_id}/tracking/{id}",
    params(
        ("case_id" = String, Path, description = "Case UUID"),
        ("id" = String, Path, description = "Tracking record UUID")
    ),
    request_body = TrackingEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = ApiResponse<CaseTracking>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "case-tracking"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_tracking(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path((case_id, id)): Path<(String, String)>,
    Json(body): Json<TrackingEntryRequest>,
) -> Result<Json<ApiResponse<CaseTracking>>, AppError> {
    let case_id = parse_case_id(&case_id)?;
    let record = repo::tracking::update(&pool, case_id, parse_record_id(&id)?, &body)
        .await?
        .ok_or_else(|| AppError::not_found("Tracking record not found"))?;

    Ok(Json(ApiResponse::with_message("Tracking record updated", record)))
}

/// DELETE /api/cases/{case_id}/tracking/{id}
#[utoipa::path(
    delete,
    path = "/api/cases/{case_id}/tracking/{id}",
    params(
        ("case_id" = String, Path, description = "Case UUID"),
        ("id" = String, Path, description = "Tracking record UUID")
    ),
    responses(
        (status = 200, description = "Entry deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "case-tracking"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_tracking(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path((case_id, id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    let case_id = parse_case_id(&case_id)?;
    if !repo::tracking::delete(&pool, case_id, parse_record_id(&id)?).await? {
        return Err(AppError::not_found("Tracking record not found"));
    }
    Ok(Json(MessageResponse::new("Tracking record deleted")))
}
