use axum::{extract::State, Json};
use sqlx::{Pool, Postgres};

use shared_types::{
    ApiResponse, AppError, ClientCaseCard, ClientDashboard, CoordinatorDashboard,
    CounsellorDashboard, ErrorResponse, LawyerDashboard, SuperAdminDashboard,
};

use crate::auth::{roles, Authorized, SuperAdmin};
use crate::repo;

/// GET /api/dashboard/super-admin
#[utoipa::path(
    get,
    path = "/api/dashboard/super-admin",
    responses(
        (status = 200, description = "System totals", body = ApiResponse<SuperAdminDashboard>),
        (status = 403, description = "Wrong role", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn super_admin(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
) -> Result<Json<ApiResponse<SuperAdminDashboard>>, AppError> {
    Ok(Json(ApiResponse::ok(repo::dashboard::super_admin(&pool).await?)))
}

/// GET /api/dashboard/coordinator
#[utoipa::path(
    get,
    path = "/api/dashboard/coordinator",
    responses(
        (status = 200, description = "Counts for cases the caller registered", body = ApiResponse<CoordinatorDashboard>),
        (status = 403, description = "Wrong role", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn coordinator(
    State(pool): State<Pool<Postgres>>,
    Authorized(caller): Authorized<{ roles::COORDINATOR }>,
) -> Result<Json<ApiResponse<CoordinatorDashboard>>, AppError> {
    Ok(Json(ApiResponse::ok(
        repo::dashboard::coordinator(&pool, caller.id()).await?,
    )))
}

/// GET /api/dashboard/lawyer
#[utoipa::path(
    get,
    path = "/api/dashboard/lawyer",
    responses(
        (status = 200, description = "Counts for assigned cases", body = ApiResponse<LawyerDashboard>),
        (status = 403, description = "Wrong role", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn lawyer(
    State(pool): State<Pool<Postgres>>,
    Authorized(caller): Authorized<{ roles::LAWYER }>,
) -> Result<Json<ApiResponse<LawyerDashboard>>, AppError> {
    Ok(Json(ApiResponse::ok(
        repo::dashboard::lawyer(&pool, caller.id()).await?,
    )))
}

/// GET /api/dashboard/counsellor
#[utoipa::path(
    get,
    path = "/api/dashboard/counsellor",
    responses(
        (status = 200, description = "Counts for assigned cases", body = ApiResponse<CounsellorDashboard>),
        (status = 403, description = "Wrong role", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn counsellor(
    State(pool): State<Pool<Postgres>>,
    Authorized(caller): Authorized<{ roles::COUNSELLOR }>,
) -> Result<Json<ApiResponse<CounsellorDashboard>>, AppError> {
    Ok(Json(ApiResponse::ok(
        repo::dashboard::counsellor(&pool, caller.id()).await?,
    )))
}

/// GET /api/dashboard/client
#[utoipa::path(
    get,
    path = "/api/dashboard/client",
    responses(
        (status = 200, description = "Latest case and total paid", body = ApiResponse<ClientDashboard>),
        (status = 403, description = "Wrong role", body = ErrorResponse)
    ),
    tag = "dashboard"
)]
pub async fn client(
    State(pool): State<Pool<Postgres>>,
    Authorized(caller): Authorized<{ roles::CLIENT }>,
) -> Result<Json<ApiResponse<ClientDashboard>>, AppError> {
    let case = repo::dashboard::client_latest_case(&pool, caller.id())
        .await?
        .map(|(case, lawyer)| ClientCaseCard { case, lawyer });
    let total_paid = repo::payment::total_paid_by_client(&pool, caller.id()).await?;

    Ok(Json(ApiResponse::ok(ClientDashboard { case, total_paid })))
}
