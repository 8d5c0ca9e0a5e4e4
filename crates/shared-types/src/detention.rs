//! Police stations, jails and counsellor jail-visit requests.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::common::UserSummary;

pub const JAIL_TYPES: &[&str] = &["Men", "Women", "Youth", "Mixed"];

pub const JAIL_VISIT_STATUSES: &[&str] = &["pending", "approved", "rejected", "more_info_needed"];

/// Statuses a reviewer may set on a visit request.
pub const JAIL_VISIT_REVIEW_STATUSES: &[&str] = &["approved", "rejected", "more_info_needed"];

pub fn is_valid_jail_type(s: &str) -> bool {
    JAIL_TYPES.contains(&s)
}

// ── Police stations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PoliceStation {
    pub id: Uuid,
    pub name: String,
    pub emirate: String,
    pub address: String,
    pub contact_number: String,
    pub officer_in_charge: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PoliceStationWithJails {
    #[serde(flatten)]
    pub station: PoliceStation,
    pub jails: Vec<Jail>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PoliceStationList {
    pub police_stations: Vec<PoliceStationWithJails>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct PoliceStationRequest {
    pub name: Option<String>,
    pub emirate: Option<String>,
    pub address: Option<String>,
    pub contact_number: Option<String>,
    pub officer_in_charge: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[serde(rename_all = "camelCase")]
pub struct PoliceStationListParams {
    pub emirate: Option<String>,
    pub search: Option<String>,
    pub include_inactive: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct EmirateCount {
    pub emirate: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PoliceStationStats {
    pub total: i64,
    pub by_emirate: Vec<EmirateCount>,
}

/// Row written to the police-station export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PoliceStationExport {
    pub name: String,
    pub emirate: String,
    pub address: String,
    pub contact_number: String,
    pub officer_in_charge: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ExportParams {
    pub format: Option<String>,
}

/// `data` is an array, a JSON string, or CSV text when `format` is `csv`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct PoliceStationImportRequest {
    pub data: Option<Value>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ImportItemError {
    pub item: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StationImportResults {
    pub success: i64,
    pub failed: i64,
    pub errors: Vec<ImportItemError>,
}

// ── Jails ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Jail {
    pub id: Uuid,
    pub name: String,
    pub police_station_id: Uuid,
    pub emirate: String,
    pub jail_type: String,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct FacilityRef {
    pub id: Uuid,
    pub name: String,
    pub emirate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct JailView {
    #[serde(flatten)]
    pub jail: Jail,
    pub police_station: Option<FacilityRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct JailList {
    pub jails: Vec<JailView>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct JailRequest {
    pub name: Option<String>,
    pub police_station_id: Option<Uuid>,
    pub jail_type: Option<String>,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[serde(rename_all = "camelCase")]
pub struct JailListParams {
    pub emirate: Option<String>,
    pub police_station_id: Option<Uuid>,
    pub search: Option<String>,
    pub include_inactive: Option<String>,
}

// ── Jail visits ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct JailVisit {
    pub id: Uuid,
    pub case_number: String,
    pub accused_name: String,
    pub jail_id: Uuid,
    pub emirate: String,
    pub counselor_id: Uuid,
    pub requested_date: NaiveDate,
    pub requested_time: String,
    pub reason: String,
    pub status: String,
    pub approved_by: Option<Uuid>,
    pub approved_date: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct JailVisitView {
    #[serde(flatten)]
    pub visit: JailVisit,
    pub jail: Option<FacilityRef>,
    pub counselor: Option<UserSummary>,
    pub approver: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct JailVisitList {
    pub jail_visits: Vec<JailVisitView>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CreateJailVisitRequest {
    pub case_number: Option<String>,
    pub accused_name: Option<String>,
    pub jail_id: Option<Uuid>,
    pub requested_date: Option<String>,
    pub requested_time: Option<String>,
    pub reason: Option<String>,
}

/// Reviewer decision on a visit request or a court quotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewRequest {
    pub status: Option<String>,
    pub remarks: Option<String>,
    pub rejection_reason: Option<String>,
}

impl ReviewRequest {
    /// Rejections fall back to the remarks when no explicit reason is given.
    pub fn effective_rejection_reason(&self) -> Option<String> {
        if self.status.as_deref() != Some("rejected") {
            return None;
        }
        self.rejection_reason
            .clone()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.remarks.clone())
    }
}

/// Jail-visit list filters. Dates bound `requested_date`.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[serde(rename_all = "camelCase")]
pub struct JailVisitListParams {
    pub status: Option<String>,
    pub emirate: Option<String>,
    pub counselor_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
