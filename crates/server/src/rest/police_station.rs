use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_facility_emirate, ApiResponse, AppError, CascadeDeleted, ErrorResponse,
    ExportParams, ImportItemError, PoliceStation, PoliceStationExport, PoliceStationImportRequest,
    PoliceStationList, PoliceStationListParams, PoliceStationRequest, PoliceStationStats,
    PoliceStationWithJails, StationImportResults,
};

use super::import::{self, Row};
use crate::auth::{AuthUser, SuperAdmin};
use crate::helpers;
use crate::repo;
use crate::repo::police_station::NewStation;

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_emirate(emirate: &str) -> Result<(), AppError> {
    if is_valid_facility_emirate(emirate) {
        Ok(())
    } else {
        Err(AppError::bad_request(format!("Invalid emirate: {emirate}")))
    }
}

/// POST /api/police-stations
#[utoipa::path(
    post,
    path = "/api/police-stations",
    request_body = PoliceStationRequest,
    responses(
        (status = 201, description = "Police station created", body = ApiResponse<PoliceStation>),
        (status = 400, description = "Missing fields or invalid emirate", body = ErrorResponse)
    ),
    tag = "police-stations"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_station(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Json(body): Json<PoliceStationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PoliceStation>>), AppError> {
    let (Some(name), Some(emirate), Some(address), Some(contact_number)) = (
        trimmed(&body.name),
        trimmed(&body.emirate),
        trimmed(&body.address),
        trimmed(&body.contact_number),
    ) else {
        return Err(AppError::bad_request(
            "Name, emirate, address, and contact number are required",
        ));
    };
    check_emirate(emirate)?;

    let station = NewStation {
        name,
        emirate,
        address,
        contact_number,
        officer_in_charge: trimmed(&body.officer_in_charge),
        is_active: body.is_active.unwrap_or(true),
    };
    let created = repo::police_station::create(&pool, &station, caller.id()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Police station created successfully",
            created,
        )),
    ))
}

/// GET /api/police-stations
#[utoipa::path(
    get,
    path = "/api/police-stations",
    params(PoliceStationListParams),
    responses(
        (status = 200, description = "Stations with their jails", body = ApiResponse<PoliceStationList>)
    ),
    tag = "police-stations"
)]
pub async fn list_stations(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Query(params): Query<PoliceStationListParams>,
) -> Result<Json<ApiResponse<PoliceStationList>>, AppError> {
    let include_inactive = params.include_inactive.as_deref() == Some("true");
    let emirate = trimmed(&params.emirate).filter(|e| *e != "all");

    let stations = repo::police_station::list(
        &pool,
        emirate,
        params.search.as_deref(),
        include_inactive,
    )
    .await?;
    let ids: Vec<Uuid> = stations.iter().map(|s| s.id).collect();
    let mut jails = repo::police_station::jails_by_station(&pool, &ids, include_inactive).await?;

    let police_stations: Vec<PoliceStationWithJails> = stations
        .into_iter()
        .map(|station| PoliceStationWithJails {
            jails: jails.remove(&station.id).unwrap_or_default(),
            station,
        })
        .collect();
    Ok(Json(ApiResponse::ok(PoliceStationList {
        count: police_stations.len(),
        police_stations,
    })))
}

/// GET /api/police-stations/{id}
#[utoipa::path(
    get,
    path = "/api/police-stations/{id}",
    params(("id" = String, Path, description = "Police station UUID")),
    responses(
        (status = 200, description = "Station with all of its jails", body = ApiResponse<PoliceStationWithJails>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "police-stations"
)]
pub async fn get_station(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PoliceStationWithJails>>, AppError> {
    let station = repo::police_station::find_by_id(&pool, parse_id(&id)?)
        .await?
        .ok_or_else(|| AppError::not_found("Police station not found"))?;
    let jails = repo::police_station::jails_by_station(&pool, &[station.id], true)
        .await?
        .remove(&station.id)
        .unwrap_or_default();
    Ok(Json(ApiResponse::ok(PoliceStationWithJails { station, jails })))
}

/// PUT /api/police-stations/{id}
#[utoipa::path(
    put,
    path = "/api/police-stations/{id}",
    params(("id" = String, Path, description = "Police station UUID")),
    request_body = PoliceStationRequest,
    responses(
        (status = 200, description = "Police station updated", body = ApiResponse<PoliceStation>),
        (status = 400, description = "Invalid emirate", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "police-stations"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_station(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<PoliceStationRequest>,
) -> Result<Json<ApiResponse<PoliceStation>>, AppError> {
    if let Some(emirate) = trimmed(&body.emirate) {
        check_emirate(emirate)?;
    }

    let station = repo::police_station::update(&pool, parse_id(&id)?, &body)
        .await?
        .ok_or_else(|| AppError::not_found("Police station not found"))?;
    if body.emirate.is_some() {
        repo::police_station::sync_jail_emirates(&pool, &station).await?;
    }
    Ok(Json(ApiResponse::with_message(
        "Police station updated successfully",
        station,
    )))
}

/// DELETE /api/police-stations/{id}
#[utoipa::path(
    delete,
    path = "/api/police-stations/{id}",
    params(("id" = String, Path, description = "Police station UUID")),
    responses(
        (status = 200, description = "Station and its jails deleted", body = ApiResponse<CascadeDeleted>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "police-stations"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_station(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CascadeDeleted>>, AppError> {
    let jails = repo::police_station::delete(&pool, parse_id(&id)?)
        .await?
        .ok_or_else(|| AppError::not_found("Police station not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Police station deleted successfully",
        CascadeDeleted {
            deleted_jails: Some(jails),
            ..Default::default()
        },
    )))
}

/// GET /api/police-stations/stats/overview
#[utoipa::path(
    get,
    path = "/api/police-stations/stats/overview",
    responses((status = 200, description = "Active station counts", body = ApiResponse<PoliceStationStats>)),
    tag = "police-stations"
)]
pub async fn station_stats(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<ApiResponse<PoliceStationStats>>, AppError> {
    let (total, by_emirate) = repo::police_station::stats(&pool).await?;
    Ok(Json(ApiResponse::ok(PoliceStationStats { total, by_emirate })))
}

const EXPORT_HEADERS: &[&str] = &[
    "name",
    "emirate",
    "address",
    "contactNumber",
    "officerInCharge",
    "isActive",
    "createdAt",
];

fn export_csv(rows: &[PoliceStationExport]) -> String {
    let lines: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.emirate.clone(),
                r.address.clone(),
                r.contact_number.clone(),
                r.officer_in_charge.clone().unwrap_or_default(),
                r.is_active.to_string(),
                r.created_at.to_rfc3339(),
            ]
        })
        .collect();
    helpers::to_csv(EXPORT_HEADERS, &lines)
}

/// GET /api/police-stations/export
#[utoipa::path(
    get,
    path = "/api/police-stations/export",
    params(ExportParams),
    responses(
        (status = 200, description = "police_stations.csv or police_stations.json attachment", body = Vec<PoliceStationExport>)
    ),
    tag = "police-stations"
)]
pub async fn export_stations(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let rows = repo::police_station::export_rows(&pool).await?;

    let (content_type, file_name, body) = if params.format.as_deref() == Some("csv") {
        ("text/csv; charset=utf-8", "police_stations.csv", export_csv(&rows))
    } else {
        let json = serde_json::to_string_pretty(&rows)
            .map_err(|e| AppError::internal(format!("Failed to export to JSON: {e}")))?;
        ("application/json", "police_stations.json", json)
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// Decode the import payload into rows: CSV text, a JSON string, or an array.
fn import_rows(req: PoliceStationImportRequest) -> Result<Vec<Row>, AppError> {
    let data = match req.data {
        None | Some(Value::Null) => return Err(AppError::bad_request("Data is required")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(AppError::bad_request("Data is required"))
        }
        Some(data) => data,
    };

    let parsed = match (req.format.as_deref(), data) {
        (Some("csv"), Value::String(text)) => {
            return Ok(helpers::parse_csv(&text));
        }
        (Some("csv"), _) => {
            return Err(AppError::bad_request("CSV data must be sent as text"));
        }
        (_, Value::String(text)) => serde_json::from_str::<Value>(&text)
            .map_err(|_| AppError::bad_request("Failed to import from JSON"))?,
        (_, other) => other,
    };

    let Value::Array(items) = parsed else {
        return Err(AppError::bad_request("Invalid data format. Expected an array."));
    };
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => map,
            _ => Row::new(),
        })
        .collect())
}

/// POST /api/police-stations/import
#[utoipa::path(
    post,
    path = "/api/police-stations/import",
    request_body = PoliceStationImportRequest,
    responses(
        (status = 200, description = "Per-row import results", body = ApiResponse<StationImportResults>),
        (status = 400, description = "Missing or malformed data", body = ErrorResponse)
    ),
    tag = "police-stations"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn import_stations(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Json(body): Json<PoliceStationImportRequest>,
) -> Result<Json<ApiResponse<StationImportResults>>, AppError> {
    let mut results = StationImportResults::default();

    for row in import_rows(body)? {
        let name = import::text(&row, "name");
        let item = name.clone().unwrap_or_else(|| "Unknown".to_string());

        let outcome = match (name.as_deref(), import::text(&row, "emirate")) {
            (Some(name), Some(emirate)) => {
                let address = import::text(&row, "address").unwrap_or_else(|| "N/A".into());
                let contact = import::text(&row, "contactNumber").unwrap_or_else(|| "N/A".into());
                let officer = import::text(&row, "officerInCharge");
                let station = NewStation {
                    name,
                    emirate: &emirate,
                    address: &address,
                    contact_number: &contact,
                    officer_in_charge: officer.as_deref(),
                    is_active: true,
                };
                match check_emirate(&emirate) {
                    Ok(()) => repo::police_station::create(&pool, &station, caller.id())
                        .await
                        .map(|_| ()),
                    Err(e) => Err(e),
                }
            }
            _ => Err(AppError::bad_request("Name and Emirate are required")),
        };

        match outcome {
            Ok(()) => results.success += 1,
            Err(e) => {
                results.failed += 1;
                results.errors.push(ImportItemError {
                    item,
                    error: e.message,
                });
            }
        }
    }

    tracing::info!(
        success = results.success,
        failed = results.failed,
        "police station import finished"
    );
    Ok(Json(ApiResponse::with_message("Import completed", results)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_accepts_csv_text() {
        let rows = import_rows(PoliceStationImportRequest {
            data: Some(json!("name,emirate\n\"Bur Dubai, HQ\",Dubai\n")),
            format: Some("csv".into()),
        })
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(import::text(&rows[0], "name").as_deref(), Some("Bur Dubai, HQ"));
    }

    #[test]
    fn import_accepts_json_string_and_arrays() {
        let from_string = import_rows(PoliceStationImportRequest {
            data: Some(json!(r#"[{"name":"A","emirate":"Dubai"}]"#)),
            format: None,
        })
        .unwrap();
        assert_eq!(from_string.len(), 1);

        let err = import_rows(PoliceStationImportRequest {
            data: Some(json!({"name": "A"})),
            format: Some("json".into()),
        })
        .unwrap_err();
        assert_eq!(err.message, "Invalid data format. Expected an array.");
    }

    #[test]
    fn import_requires_data() {
        let err = import_rows(PoliceStationImportRequest::default()).unwrap_err();
        assert_eq!(err.message, "Data is required");
    }
}
