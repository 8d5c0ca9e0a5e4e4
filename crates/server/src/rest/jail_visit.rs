use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    parse_date_input, ApiResponse, AppError, CreateJailVisitRequest, ErrorResponse, JailVisit,
    JailVisitList, JailVisitListParams, JailVisitView, MessageResponse, ReviewRequest, Role,
    JAIL_VISIT_REVIEW_STATUSES,
};

use super::case::author;
use crate::auth::{roles, AuthUser, Authorized, CurrentUser};
use crate::repo;
use crate::repo::jail_visit::{JailVisitFilter, NewJailVisit};

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Counsellors only ever see the requests they filed.
fn counsellor_scope(caller: &CurrentUser, requested: Option<Uuid>) -> Option<Uuid> {
    if caller.role == Role::Counsellor {
        Some(caller.id())
    } else {
        requested
    }
}

/// Processed requests are removable by a super admin only; counsellors may
/// only remove their own.
pub(crate) fn check_deletable(
    caller: &CurrentUser,
    status: &str,
    owner: Uuid,
    processed_message: &str,
    forbidden_message: &str,
) -> Result<(), AppError> {
    if status != "pending" && !caller.is_super_admin() {
        return Err(AppError::bad_request(processed_message));
    }
    if caller.role == Role::Counsellor && owner != caller.id() {
        return Err(AppError::forbidden(forbidden_message));
    }
    Ok(())
}

async fn load_visit(pool: &Pool<Postgres>, id: &str) -> Result<JailVisit, AppError> {
    repo::jail_visit::find_by_id(pool, parse_id(id)?)
        .await?
        .ok_or_else(|| AppError::not_found("Visit request not found"))
}

async fn views(pool: &Pool<Postgres>, visits: Vec<JailVisit>) -> Result<Vec<JailVisitView>, AppError> {
    let jail_ids: Vec<Uuid> = visits.iter().map(|v| v.jail_id).collect();
    let user_ids: Vec<Uuid> = visits
        .iter()
        .flat_map(|v| [Some(v.counselor_id), v.approved_by])
        .flatten()
        .collect();
    let jails = repo::jail::jail_refs(pool, &jail_ids).await?;
    let users = repo::user::summaries_by_ids(pool, &user_ids).await?;

    Ok(visits
        .into_iter()
        .map(|visit| JailVisitView {
            jail: jails.get(&visit.jail_id).cloned(),
            counselor: author(repo::user::pick(&users, Some(visit.counselor_id))),
            approver: author(repo::user::pick(&users, visit.approved_by)),
            visit,
        })
        .collect())
}

/// POST /api/jail-visits
#[utoipa::path(
    post,
    path = "/api/jail-visits",
    request_body = CreateJailVisitRequest,
    responses(
        (status = 201, description = "Visit request filed", body = ApiResponse<JailVisit>),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 404, description = "Jail not found", body = ErrorResponse)
    ),
    tag = "jail-visits"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_visit(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreateJailVisitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JailVisit>>), AppError> {
    let (
        Some(case_number),
        Some(accused_name),
        Some(jail_id),
        Some(requested_date),
        Some(requested_time),
        Some(reason),
    ) = (
        required(&body.case_number),
        required(&body.accused_name),
        body.jail_id,
        required(&body.requested_date),
        required(&body.requested_time),
        required(&body.reason),
    )
    else {
        return Err(AppError::bad_request("All fields are required"));
    };
    let requested_date = parse_date_input(requested_date)
        .ok_or_else(|| AppError::bad_request("Invalid requested date"))?;

    let jail = repo::jail::find_by_id(&pool, jail_id)
        .await?
        .ok_or_else(|| AppError::not_found("Jail not found"))?;

    let visit = repo::jail_visit::create(
        &pool,
        &NewJailVisit {
            case_number,
            accused_name,
            jail_id: jail.id,
            emirate: &jail.emirate,
            counselor_id: caller.id(),
            requested_date,
            requested_time,
            reason,
        },
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Jail visit request created successfully",
            visit,
        )),
    ))
}

/// GET /api/jail-visits
#[utoipa::path(
    get,
    path = "/api/jail-visits",
    params(JailVisitListParams),
    responses((status = 200, description = "Visit requests, newest first", body = ApiResponse<JailVisitList>)),
    tag = "jail-visits"
)]
pub async fn list_visits(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Query(params): Query<JailVisitListParams>,
) -> Result<Json<ApiResponse<JailVisitList>>, AppError> {
    let filter = JailVisitFilter {
        status: params.status.filter(|s| !s.is_empty()),
        emirate: params.emirate.filter(|e| !e.is_empty() && e != "all"),
        counselor_id: counsellor_scope(&caller, params.counselor_id),
        start_date: params.start_date.as_deref().and_then(parse_date_input),
        end_date: params.end_date.as_deref().and_then(parse_date_input),
    };
    let jail_visits = views(&pool, repo::jail_visit::list(&pool, &filter).await?).await?;
    Ok(Json(ApiResponse::ok(JailVisitList {
        count: jail_visits.len(),
        jail_visits,
    })))
}

/// GET /api/jail-visits/{id}
#[utoipa::path(
    get,
    path = "/api/jail-visits/{id}",
    params(("id" = String, Path, description = "Visit request UUID")),
    responses(
        (status = 200, description = "Visit request", body = ApiResponse<JailVisitView>),
        (status = 403, description = "Another counsellor's request", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "jail-visits"
)]
pub async fn get_visit(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<JailVisitView>>, AppError> {
    let visit = load_visit(&pool, &id).await?;
    if caller.role == Role::Counsellor && visit.counselor_id != caller.id() {
        return Err(AppError::forbidden("Not authorized to view this request"));
    }
    let view = views(&pool, vec![visit])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Visit request not found"))?;
    Ok(Json(ApiResponse::ok(view)))
}

/// PUT /api/jail-visits/{id}/status
#[utoipa::path(
    put,
    path = "/api/jail-visits/{id}/status",
    params(("id" = String, Path, description = "Visit request UUID")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ApiResponse<JailVisit>),
        (status = 400, description = "Invalid status", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "jail-visits"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn review_visit(
    State(pool): State<Pool<Postgres>>,
    Authorized(caller): Authorized<{ roles::ADMIN_OR_LAWYER }>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<JailVisit>>, AppError> {
    let status = body
        .status
        .as_deref()
        .filter(|s| JAIL_VISIT_REVIEW_STATUSES.contains(s))
        .ok_or_else(|| AppError::bad_request("Invalid status"))?;
    let visit = load_visit(&pool, &id).await?;

    let rejection_reason = body.effective_rejection_reason();
    let updated = repo::jail_visit::review(
        &pool,
        visit.id,
        status,
        caller.id(),
        body.remarks.as_deref(),
        rejection_reason.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Visit request not found"))?;

    tracing::info!(visit_id = %updated.id, status, "jail visit reviewed");
    Ok(Json(ApiResponse::with_message(
        "Jail visit status updated successfully",
        updated,
    )))
}

/// DELETE /api/jail-visits/{id}
#[utoipa::path(
    delete,
    path = "/api/jail-visits/{id}",
    params(("id" = String, Path, description = "Visit request UUID")),
    responses(
        (status = 200, description = "Visit request deleted", body = MessageResponse),
        (status = 400, description = "Already processed", body = ErrorResponse),
        (status = 403, description = "Another counsellor's request", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "jail-visits"
)]
#[tracing::instrument(skip(pool, caller))]
pub async fn delete_visit(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let visit = load_visit(&pool, &id).await?;
    check_deletable(
        &caller,
        &visit.status,
        visit.counselor_id,
        "Cannot delete processed requests",
        "Not authorized to delete this request",
    )?;

    repo::jail_visit::delete(&pool, visit.id).await?;
    Ok(Json(MessageResponse::new("Visit request deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::user_with_role;

    #[test]
    fn counsellors_are_pinned_to_their_own_requests() {
        let counsellor = user_with_role(Role::Counsellor);
        let other = Uuid::new_v4();
        assert_eq!(counsellor_scope(&counsellor, Some(other)), Some(counsellor.id()));

        let lawyer = user_with_role(Role::Lawyer);
        assert_eq!(counsellor_scope(&lawyer, Some(other)), Some(other));
        assert_eq!(counsellor_scope(&lawyer, None), None);
    }

    #[test]
    fn processed_requests_need_a_super_admin() {
        let counsellor = user_with_role(Role::Counsellor);
        let err = check_deletable(&counsellor, "approved", counsellor.id(), "processed", "forbidden")
            .unwrap_err();
        assert_eq!(err.message, "processed");

        let admin = user_with_role(Role::SuperAdmin);
        assert!(check_deletable(&admin, "approved", Uuid::new_v4(), "processed", "forbidden").is_ok());
    }

    #[test]
    fn counsellors_cannot_delete_other_requests() {
        let counsellor = user_with_role(Role::Counsellor);
        let err = check_deletable(&counsellor, "pending", Uuid::new_v4(), "processed", "forbidden")
            .unwrap_err();
        assert_eq!(err.message, "forbidden");
    }
}
