use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    ApiResponse, AppError, CascadeDeleted, ErrorResponse, IncludeInactiveParams, MessageResponse,
    OccupationSubType, OccupationSubTypeRequest, OccupationSubTypeView, OccupationType,
    OccupationTypeRequest, OccupationTypeTree,
};

use crate::auth::{AuthUser, SuperAdmin};
use crate::repo;

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn ensure_type_exists(pool: &Pool<Postgres>, id: Uuid) -> Result<OccupationType, AppError> {
    repo::occupation::find_type(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Occupation type not found"))
}

/// POST /api/work-occupations/types
#[utoipa::path(
    post,
    path = "/api/work-occupations/types",
    request_body = OccupationTypeRequest,
    responses(
        (status = 201, description = "Occupation type created", body = ApiResponse<OccupationType>),
        (status = 400, description = "Missing or duplicate name", body = ErrorResponse)
    ),
    tag = "work-occupations"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Json(body): Json<OccupationTypeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OccupationType>>), AppError> {
    let name = trimmed(&body.name).ok_or_else(|| AppError::bad_request("Name is required"))?;
    if repo::occupation::name_taken(&pool, name, None).await? {
        return Err(AppError::bad_request(
            "Occupation type with this name already exists",
        ));
    }

    let created = repo::occupation::create_type(
        &pool,
        name,
        body.is_active.unwrap_or(true),
        caller.id(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Occupation type created successfully",
            created,
        )),
    ))
}

/// GET /api/work-occupations/types
#[utoipa::path(
    get,
    path = "/api/work-occupations/types",
    params(IncludeInactiveParams),
    responses(
        (status = 200, description = "Types with sub-types", body = ApiResponse<Vec<OccupationTypeTree>>)
    ),
    tag = "work-occupations"
)]
pub async fn list_types(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Query(params): Query<IncludeInactiveParams>,
) -> Result<Json<ApiResponse<Vec<OccupationTypeTree>>>, AppError> {
    Ok(Json(ApiResponse::ok(
        repo::occupation::type_trees(&pool, params.include_inactive()).await?,
    )))
}

/// PUT /api/work-occupations/types/{id}
#[utoipa::path(
    put,
    path = "/api/work-occupations/types/{id}",
    params(("id" = String, Path, description = "Occupation type UUID")),
    request_body = OccupationTypeRequest,
    responses(
        (status = 200, description = "Occupation type updated", body = ApiResponse<OccupationType>),
        (status = 400, description = "Duplicate name", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "work-occupations"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<OccupationTypeRequest>,
) -> Result<Json<ApiResponse<OccupationType>>, AppError> {
    let id = parse_id(&id)?;
    let current = ensure_type_exists(&pool, id).await?;
    let name = trimmed(&body.name).filter(|n| *n != current.name);
    if let Some(name) = name {
        if repo::occupation::name_taken(&pool, name, Some(id)).await? {
            return Err(AppError::bad_request(
                "Occupation type with this name already exists",
            ));
        }
    }

    let updated = repo::occupation::update_type(&pool, id, name, body.is_active)
        .await?
        .ok_or_else(|| AppError::not_found("Occupation type not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Occupation type updated successfully",
        updated,
    )))
}

/// DELETE /api/work-occupations/types/{id}
#[utoipa::path(
    delete,
    path = "/api/work-occupations/types/{id}",
    params(("id" = String, Path, description = "Occupation type UUID")),
    responses(
        (status = 200, description = "Type and its sub-types deleted", body = ApiResponse<CascadeDeleted>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "work-occupations"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CascadeDeleted>>, AppError> {
    let deleted = repo::occupation::delete_type(&pool, parse_id(&id)?)
        .await?
        .ok_or_else(|| AppError::not_found("Occupation type not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Occupation type deleted successfully",
        CascadeDeleted {
            deleted_sub_types: Some(deleted),
            ..Default::default()
        },
    )))
}

/// POST /api/work-occupations/sub-types
#[utoipa::path(
    post,
    path = "/api/work-occupations/sub-types",
    request_body = OccupationSubTypeRequest,
    responses(
        (status = 201, description = "Sub-type created", body = ApiResponse<OccupationSubType>),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 404, description = "Occupation type not found", body = ErrorResponse)
    ),
    tag = "work-occupations"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn create_sub_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Json(body): Json<OccupationSubTypeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OccupationSubType>>), AppError> {
    let (Some(name), Some(type_id)) = (trimmed(&body.name), body.occupation_type_id) else {
        return Err(AppError::bad_request(
            "Name and occupation type ID are required",
        ));
    };
    ensure_type_exists(&pool, type_id).await?;

    let created = repo::occupation::create_sub_type(
        &pool,
        name,
        type_id,
        body.is_active.unwrap_or(true),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Occupation sub-type created successfully",
            created,
        )),
    ))
}

/// GET /api/work-occupations/sub-types
#[utoipa::path(
    get,
    path = "/api/work-occupations/sub-types",
    responses(
        (status = 200, description = "Sub-types with their type", body = ApiResponse<Vec<OccupationSubTypeView>>)
    ),
    tag = "work-occupations"
)]
pub async fn list_sub_types(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<OccupationSubTypeView>>>, AppError> {
    let subs = repo::occupation::list_sub_types(&pool, None, false).await?;
    let type_ids: Vec<Uuid> = subs.iter().map(|s| s.occupation_type_id).collect();
    let types = repo::occupation::type_refs(&pool, &type_ids).await?;

    let views = subs
        .into_iter()
        .map(|sub_type| OccupationSubTypeView {
            occupation_type: types.get(&sub_type.occupation_type_id).cloned(),
            sub_type,
        })
        .collect();
    Ok(Json(ApiResponse::ok(views)))
}

/// GET /api/work-occupations/sub-types/by-type/{type_id}
#[utoipa::path(
    get,
    path = "/api/work-occupations/sub-types/by-type/{type_id}",
    params(("type_id" = String, Path, description = "Occupation type UUID")),
    responses(
        (status = 200, description = "Active sub-types of the type", body = ApiResponse<Vec<OccupationSubType>>)
    ),
    tag = "work-occupations"
)]
pub async fn sub_types_by_type(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(type_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<OccupationSubType>>>, AppError> {
    let type_id = parse_id(&type_id)?;
    Ok(Json(ApiResponse::ok(
        repo::occupation::list_sub_types(&pool, Some(type_id), true).await?,
    )))
}

/// PUT /api/work-occupations/sub-types/{id}
#[utoipa::path(
    put,
    path = "/api/work-occupations/sub-types/{id}",
    params(("id" = String, Path, description = "Sub-type UUID")),
    request_body = OccupationSubTypeRequest,
    responses(
        (status = 200, description = "Sub-type updated", body = ApiResponse<OccupationSubType>),
        (status = 404, description = "Sub-type or type not found", body = ErrorResponse)
    ),
    tag = "work-occupations"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_sub_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<OccupationSubTypeRequest>,
) -> Result<Json<ApiResponse<OccupationSubType>>, AppError> {
    let id = parse_id(&id)?;
    if let Some(type_id) = body.occupation_type_id {
        ensure_type_exists(&pool, type_id).await?;
    }

    let updated = repo::occupation::update_sub_type(
        &pool,
        id,
        trimmed(&body.name),
        body.occupation_type_id,
        body.is_active,
    )
    .await?
    .ok_or_else(|| AppError::not_found("Occupation sub-type not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Occupation sub-type updated successfully",
        updated,
    )))
}

/// DELETE /api/work-occupations/sub-types/{id}
#[utoipa::path(
    delete,
    path = "/api/work-occupations/sub-types/{id}",
    params(("id" = String, Path, description = "Sub-type UUID")),
    responses(
        (status = 200, description = "Sub-type deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "work-occupations"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_sub_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !repo::occupation::delete_sub_type(&pool, parse_id(&id)?).await? {
        return Err(AppError::not_found("Occupation sub-type not found"));
    }
    Ok(Json(MessageResponse::new(
        "Occupation sub-type deleted successfully",
    )))
}
