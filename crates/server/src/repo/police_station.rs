use std::collections::HashMap;

use shared_types::{AppError, EmirateCount, Jail, PoliceStation, PoliceStationExport, PoliceStationRequest};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Fields of a new station after defaults are applied.
#[derive(Debug, Clone)]
pub struct NewStation<'a> {
    pub name: &'a str,
    pub emirate: &'a str,
    pub address: &'a str,
    pub contact_number: &'a str,
    pub officer_in_charge: Option<&'a str>,
    pub is_active: bool,
}

pub async fn create(
    pool: &Pool<Postgres>,
    station: &NewStation<'_>,
    created_by: Uuid,
) -> Result<PoliceStation, AppError> {
    sqlx::query_as::<_, PoliceStation>(
        r#"
        INSERT INTO police_stations
            (name, emirate, address, contact_number, officer_in_charge, is_active, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(station.name)
    .bind(station.emirate)
    .bind(station.address)
    .bind(station.contact_number)
    .bind(station.officer_in_charge)
    .bind(station.is_active)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<PoliceStation>, AppError> {
    sqlx::query_as::<_, PoliceStation>("SELECT * FROM police_stations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list(
    pool: &Pool<Postgres>,
    emirate: Option<&str>,
    search: Option<&str>,
    include_inactive: bool,
) -> Result<Vec<PoliceStation>, AppError> {
    let pattern = search.map(str::trim).filter(|s| !s.is_empty()).map(|s| format!("%{s}%"));
    sqlx::query_as::<_, PoliceStation>(
        r#"
        SELECT * FROM police_stations
        WHERE ($1::TEXT IS NULL OR emirate = $1)
          AND ($2::TEXT IS NULL OR name ILIKE $2 OR address ILIKE $2)
          AND ($3 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(emirate)
    .bind(pattern.as_deref())
    .bind(include_inactive)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Jails grouped by station, ordered by name.
pub async fn jails_by_station(
    pool: &Pool<Postgres>,
    station_ids: &[Uuid],
    include_inactive: bool,
) -> Result<HashMap<Uuid, Vec<Jail>>, AppError> {
    let rows = sqlx::query_as::<_, Jail>(
        r#"
        SELECT * FROM jails
        WHERE police_station_id = ANY($1) AND ($2 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(station_ids)
    .bind(include_inactive)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let mut map: HashMap<Uuid, Vec<Jail>> = HashMap::new();
    for jail in rows {
        map.entry(jail.police_station_id).or_default().push(jail);
    }
    Ok(map)
}

pub async fn update(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &PoliceStationRequest,
) -> Result<Option<PoliceStation>, AppError> {
    sqlx::query_as::<_, PoliceStation>(
        r#"
        UPDATE police_stations SET
            name              = COALESCE($2, name),
            emirate           = COALESCE($3, emirate),
            address           = COALESCE($4, address),
            contact_number    = COALESCE($5, contact_number),
            officer_in_charge = COALESCE($6, officer_in_charge),
            is_active         = COALESCE($7, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.emirate.as_deref().map(str::trim))
    .bind(req.address.as_deref().map(str::trim))
    .bind(req.contact_number.as_deref().map(str::trim))
    .bind(req.officer_in_charge.as_deref().map(str::trim))
    .bind(req.is_active)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Keeps jails in step with their station's emirate.
pub async fn sync_jail_emirates(pool: &Pool<Postgres>, station: &PoliceStation) -> Result<(), AppError> {
    sqlx::query("UPDATE jails SET emirate = $2 WHERE police_station_id = $1 AND emirate <> $2")
        .bind(station.id)
        .bind(&station.emirate)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;
    Ok(())
}

/// Returns the number of jails removed with the station.
pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<i64>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let jails: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jails WHERE police_station_id = $1")
        .bind(id)
        .fetch_one(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    let result = sqlx::query("DELETE FROM police_stations WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok((result.rows_affected() > 0).then_some(jails))
}

/// Active station counts, in total and per emirate.
pub async fn stats(pool: &Pool<Postgres>) -> Result<(i64, Vec<EmirateCount>), AppError> {
    let by_emirate = sqlx::query_as::<_, EmirateCount>(
        r#"
        SELECT emirate, COUNT(*) AS count
        FROM police_stations
        WHERE is_active
        GROUP BY emirate
        ORDER BY emirate
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let total = by_emirate.iter().map(|e| e.count).sum();
    Ok((total, by_emirate))
}

pub async fn export_rows(pool: &Pool<Postgres>) -> Result<Vec<PoliceStationExport>, AppError> {
    sqlx::query_as::<_, PoliceStationExport>(
        r#"
        SELECT name, emirate, address, contact_number, officer_in_charge, is_active, created_at
        FROM police_stations
        ORDER BY emirate, name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
