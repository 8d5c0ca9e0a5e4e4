use std::collections::HashMap;

use shared_types::{AppError, OccupationSubType, OccupationType, OccupationTypeRef, OccupationTypeTree};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

pub async fn name_taken(
    pool: &Pool<Postgres>,
    name: &str,
    exclude: Option<Uuid>,
) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM work_occupation_types
            WHERE LOWER(name) = LOWER($1) AND ($2::UUID IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn create_type(
    pool: &Pool<Postgres>,
    name: &str,
    is_active: bool,
    created_by: Uuid,
) -> Result<OccupationType, AppError> {
    sqlx::query_as::<_, OccupationType>(
        r#"
        INSERT INTO work_occupation_types (name, is_active, created_by)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(is_active)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_type(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<OccupationType>, AppError> {
    sqlx::query_as::<_, OccupationType>("SELECT * FROM work_occupation_types WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Types with their sub-types, both ordered by name.
pub async fn type_trees(
    pool: &Pool<Postgres>,
    include_inactive: bool,
) -> Result<Vec<OccupationTypeTree>, AppError> {
    let types = sqlx::query_as::<_, OccupationType>(
        "SELECT * FROM work_occupation_types WHERE ($1 OR is_active) ORDER BY name",
    )
    .bind(include_inactive)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let ids: Vec<Uuid> = types.iter().map(|t| t.id).collect();
    let subs = sqlx::query_as::<_, OccupationSubType>(
        r#"
        SELECT * FROM work_occupation_sub_types
        WHERE occupation_type_id = ANY($1) AND ($2 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(&ids)
    .bind(include_inactive)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let mut by_type: HashMap<Uuid, Vec<OccupationSubType>> = HashMap::new();
    for sub in subs {
        by_type.entry(sub.occupation_type_id).or_default().push(sub);
    }

    Ok(types
        .into_iter()
        .map(|occupation_type| OccupationTypeTree {
            sub_types: by_type.remove(&occupation_type.id).unwrap_or_default(),
            occupation_type,
        })
        .collect())
}

pub async fn update_type(
    pool: &Pool<Postgres>,
    id: Uuid,
    name: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<OccupationType>, AppError> {
    sqlx::query_as::<_, OccupationType>(
        r#"
        UPDATE work_occupation_types SET
            name      = COALESCE($2, name),
            is_active = COALESCE($3, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(is_active)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Returns how many sub-types went with it.
pub async fn delete_type(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<i64>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let subs: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM work_occupation_sub_types WHERE occupation_type_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let result = sqlx::query("DELETE FROM work_occupation_types WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok((result.rows_affected() > 0).then_some(subs))
}

// ── Sub-types ───────────────────────────────────────────────────────

pub async fn create_sub_type(
    pool: &Pool<Postgres>,
    name: &str,
    occupation_type_id: Uuid,
    is_active: bool,
) -> Result<OccupationSubType, AppError> {
    sqlx::query_as::<_, OccupationSubType>(
        r#"
        INSERT INTO work_occupation_sub_types (name, occupation_type_id, is_active)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(occupation_type_id)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list_sub_types(
    pool: &Pool<Postgres>,
    occupation_type_id: Option<Uuid>,
    active_only: bool,
) -> Result<Vec<OccupationSubType>, AppError> {
    sqlx::query_as::<_, OccupationSubType>(
        r#"
        SELECT * FROM work_occupation_sub_types
        WHERE ($1::UUID IS NULL OR occupation_type_id = $1) AND (NOT $2 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(occupation_type_id)
    .bind(active_only)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn type_refs(
    pool: &Pool<Postgres>,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, OccupationTypeRef>, AppError> {
    let rows = sqlx::query_as::<_, OccupationTypeRef>(
        "SELECT id, name FROM work_occupation_types WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows.into_iter().map(|r| (r.id, r)).collect())
}

pub async fn update_sub_type(
    pool: &Pool<Postgres>,
    id: Uuid,
    name: Option<&str>,
    occupation_type_id: Option<Uuid>,
    is_active: Option<bool>,
) -> Result<Option<OccupationSubType>, AppError> {
    sqlx::query_as::<_, OccupationSubType>(
        r#"
        UPDATE work_occupation_sub_types SET
            name               = COALESCE($2, name),
            occupation_type_id = COALESCE($3, occupation_type_id),
            is_active          = COALESCE($4, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(occupation_type_id)
    .bind(is_active)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_sub_type(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM work_occupation_sub_types WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
