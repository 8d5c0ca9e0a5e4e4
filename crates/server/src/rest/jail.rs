use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_jail_type, ApiResponse, AppError, ErrorResponse, Jail, JailList, JailListParams,
    JailRequest, JailView, MessageResponse, PoliceStation, JAIL_TYPES,
};

use crate::auth::{AuthUser, SuperAdmin};
use crate::repo;
use crate::repo::jail::JailFilter;

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

async fn load_station(pool: &Pool<Postgres>, id: Uuid) -> Result<PoliceStation, AppError> {
    repo::police_station::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Police station not found"))
}

fn check_jail_type(jail_type: &str) -> Result<(), AppError> {
    if is_valid_jail_type(jail_type) {
        Ok(())
    } else {
        Err(AppError::bad_request(format!(
            "Invalid jail type. Valid values: {}",
            JAIL_TYPES.join(", ")
        )))
    }
}

async fn with_stations(pool: &Pool<Postgres>, jails: Vec<Jail>) -> Result<Vec<JailView>, AppError> {
    let ids: Vec<Uuid> = jails.iter().map(|j| j.police_station_id).collect();
    let stations = repo::jail::station_refs(pool, &ids).await?;
    Ok(jails
        .into_iter()
        .map(|jail| JailView {
            police_station: stations.get(&jail.police_station_id).cloned(),
            jail,
        })
        .collect())
}

/// POST /api/jails
#[utoipa::path(
    post,
    path = "/api/jails",
    request_body = JailRequest,
    responses(
        (status = 201, description = "Jail created", body = ApiResponse<Jail>),
        (status = 400, description = "Missing fields or invalid jail type", body = ErrorResponse),
        (status = 404, description = "Police station not found", body = ErrorResponse)
    ),
    tag = "jails"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_jail(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Json(body): Json<JailRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Jail>>), AppError> {
    let name = body.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let (Some(name), Some(station_id), Some(jail_type)) =
        (name, body.police_station_id, body.jail_type.as_deref())
    else {
        return Err(AppError::bad_request(
            "Name, police station, and jail type are required",
        ));
    };
    check_jail_type(jail_type)?;
    let station = load_station(&pool, station_id).await?;

    let jail = repo::jail::create(
        &pool,
        name,
        station.id,
        &station.emirate,
        jail_type,
        &body,
        caller.id(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Jail created successfully", jail)),
    ))
}

/// GET /api/jails
#[utoipa::path(
    get,
    path = "/api/jails",
    params(JailListParams),
    responses((status = 200, description = "Jails with their station", body = ApiResponse<JailList>)),
    tag = "jails"
)]
pub async fn list_jails(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Query(params): Query<JailListParams>,
) -> Result<Json<ApiResponse<JailList>>, AppError> {
    let filter = JailFilter {
        emirate: params.emirate.filter(|e| !e.is_empty() && e != "all"),
        police_station_id: params.police_station_id,
        search: params.search,
        include_inactive: params.include_inactive.as_deref() == Some("true"),
    };
    let jails = with_stations(&pool, repo::jail::list(&pool, &filter).await?).await?;
    Ok(Json(ApiResponse::ok(JailList {
        count: jails.len(),
        jails,
    })))
}

/// GET /api/jails/{id}
#[utoipa::path(
    get,
    path = "/api/jails/{id}",
    params(("id" = String, Path, description = "Jail UUID")),
    responses(
        (status = 200, description = "Jail with its station", body = ApiResponse<JailView>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "jails"
)]
pub async fn get_jail(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<JailView>>, AppError> {
    let jail = repo::jail::find_by_id(&pool, parse_id(&id)?)
        .await?
        .ok_or_else(|| AppError::not_found("Jail not found"))?;
    let view = with_stations(&pool, vec![jail])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Jail not found"))?;
    Ok(Json(ApiResponse::ok(view)))
}

/// PUT /api/jails/{id}
#[utoipa::path(
    put,
    path = "/api/jails/{id}",
    params(("id" = String, Path, description = "Jail UUID")),
    request_body = JailRequest,
    responses(
        (status = 200, description = "Jail updated", body = ApiResponse<Jail>),
        (status = 404, description = "Jail or police station not found", body = ErrorResponse)
    ),
    tag = "jails"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_jail(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<JailRequest>,
) -> Result<Json<ApiResponse<Jail>>, AppError> {
    let id = parse_id(&id)?;
    let current = repo::jail::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Jail not found"))?;
    if let Some(jail_type) = body.jail_type.as_deref() {
        check_jail_type(jail_type)?;
    }

    // Moving a jail to another station re-derives its emirate.
    let emirate = match body.police_station_id {
        Some(station_id) if station_id != current.police_station_id => {
            Some(load_station(&pool, station_id).await?.emirate)
        }
        _ => None,
    };

    let jail = repo::jail::update(&pool, id, &body, emirate.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("Jail not found"))?;
    Ok(Json(ApiResponse::with_message("Jail updated successfully", jail)))
}

/// DELETE /api/jails/{id}
#[utoipa::path(
    delete,
    path = "/api/jails/{id}",
    params(("id" = String, Path, description = "Jail UUID")),
    responses(
        (status = 200, description = "Jail deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "jails"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_jail(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !repo::jail::delete(&pool, parse_id(&id)?).await? {
        return Err(AppError::not_found("Jail not found"));
    }
    Ok(Json(MessageResponse::new("Jail deleted successfully")))
}
