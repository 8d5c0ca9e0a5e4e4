use std::collections::HashMap;

use shared_types::{AppError, FacilityRef, Jail, JailRequest};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

#[derive(Debug, Clone, Default)]
pub struct JailFilter {
    pub emirate: Option<String>,
    pub police_station_id: Option<Uuid>,
    pub search: Option<String>,
    pub include_inactive: bool,
}

/// `emirate` is copied from the station by the caller.
pub async fn create(
    pool: &Pool<Postgres>,
    name: &str,
    police_station_id: Uuid,
    emirate: &str,
    jail_type: &str,
    req: &JailRequest,
    created_by: Uuid,
) -> Result<Jail, AppError> {
    sqlx::query_as::<_, Jail>(
        r#"
        INSERT INTO jails
            (name, police_station_id, emirate, jail_type, capacity, description,
             is_active, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, TRUE), $8)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(police_station_id)
    .bind(emirate)
    .bind(jail_type)
    .bind(req.capacity)
    .bind(req.description.as_deref())
    .bind(req.is_active)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Jail>, AppError> {
    sqlx::query_as::<_, Jail>("SELECT * FROM jails WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(pool: &Pool<Postgres>, filter: &JailFilter) -> Result<Vec<Jail>, AppError> {
    let pattern = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));
    sqlx::query_as::<_, Jail>(
        r#"
        SELECT * FROM jails
        WHERE ($1::TEXT IS NULL OR emirate = $1)
          AND ($2::UUID IS NULL OR police_station_id = $2)
          AND ($3::TEXT IS NULL OR name ILIKE $3)
          AND ($4 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(filter.emirate.as_deref())
    .bind(filter.police_station_id)
    .bind(pattern.as_deref())
    .bind(filter.include_inactive)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// `emirate` is re-derived by the caller when the station changes.
pub async fn update(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &JailRequest,
    emirate: Option<&str>,
) -> Result<Option<Jail>, AppError> {
    sqlx::query_as::<_, Jail>(
        r#"
        UPDATE jails SET
            name              = COALESCE($2, name),
            police_station_id = COALESCE($3, police_station_id),
            emirate           = COALESCE($4, emirate),
            jail_type         = COALESCE($5, jail_type),
            capacity          = COALESCE($6, capacity),
            description       = COALESCE($7, description),
            is_active         = COALESCE($8, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.police_station_id)
    .bind(emirate)
    .bind(req.jail_type.as_deref())
    .bind(req.capacity)
    .bind(req.description.as_deref())
    .bind(req.is_active)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM jails WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

pub async fn station_refs(
    pool: &Pool<Postgres>,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, FacilityRef>, AppError> {
    let rows = sqlx::query_as::<_, FacilityRef>(
        "SELECT id, name, emirate FROM police_stations WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows.into_iter().map(|r| (r.id, r)).collect())
}

pub async fn jail_refs(
    pool: &Pool<Postgres>,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, FacilityRef>, AppError> {
    let rows = sqlx::query_as::<_, FacilityRef>(
        "SELECT id, name, emirate FROM jails WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows.into_iter().map(|r| (r.id, r)).collect())
}
