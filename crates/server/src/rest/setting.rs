use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::{Pool, Postgres};

use shared_types::{ApiResponse, AppError, ErrorResponse, Setting, UpsertSettingRequest};

use crate::auth::SuperAdmin;
use crate::repo;

/// GET /api/settings
#[utoipa::path(
    get,
    path = "/api/settings",
    responses(
        (status = 200, description = "All settings", body = ApiResponse<Vec<Setting>>),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn list_settings(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
) -> Result<Json<ApiResponse<Vec<Setting>>>, AppError> {
    Ok(Json(ApiResponse::ok(repo::setting::list(&pool).await?)))
}

/// GET /api/settings/{key}
#[utoipa::path(
    get,
    path = "/api/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting", body = ApiResponse<Setting>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "settings"
)]
pub async fn get_setting(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<Setting>>, AppError> {
    let setting = repo::setting::find_by_key(&pool, &key)
        .await?
        .ok_or_else(|| AppError::not_found("Setting not found"))?;
    Ok(Json(ApiResponse::ok(setting)))
}

/// PUT /api/settings/{key}
#[utoipa::path(
    put,
    path = "/api/settings/{key}",
    params(("key" = String, Path, description = "Setting key")),
    request_body = UpsertSettingRequest,
    responses(
        (status = 200, description = "Setting saved", body = ApiResponse<Setting>),
        (status = 400, description = "Missing value", body = ErrorResponse)
    ),
    tag = "settings"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn put_setting(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Path(key): Path<String>,
    Json(body): Json<UpsertSettingRequest>,
) -> Result<Json<ApiResponse<Setting>>, AppError> {
    let value = body
        .value
        .ok_or_else(|| AppError::bad_request("Value is required"))?;
    let setting = repo::setting::upsert(
        &pool,
        &key,
        &value,
        body.category.as_deref(),
        body.description.as_deref(),
        caller.id(),
    )
    .await?;

    tracing::info!(key = %setting.key, "Setting updated");
    Ok(Json(ApiResponse::with_message("Setting saved", setting)))
}
