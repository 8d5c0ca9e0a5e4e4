use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CONSULTATION_TYPES: &[&str] = &["in_person", "video", "phone"];

pub const CONSULTATION_STATUSES: &[&str] =
    &["pending", "confirmed", "completed", "cancelled", "rescheduled"];

pub fn is_valid_consultation_type(s: &str) -> bool {
    CONSULTATION_TYPES.contains(&s)
}

pub fn is_valid_consultation_status(s: &str) -> bool {
    CONSULTATION_STATUSES.contains(&s)
}

/// A booked consultation. Anonymous bookings have no `client_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub counsellor_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    #[serde(rename = "type")]
    #[cfg_attr(feature = "server", sqlx(rename = "type"))]
    pub consultation_type: String,
    pub status: String,
    pub scheduled_date: DateTime<Utc>,
    pub duration: i32,
    pub price: f64,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub notes: Option<String>,
    pub outcome_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "validation", derive(validator::Validate))]
#[serde(rename_all = "camelCase", default)]
pub struct CreateConsultationRequest {
    #[serde(rename = "type")]
    pub consultation_type: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    #[serde(deserialize_with = "crate::common::lenient_f64::deserialize")]
    pub price: Option<f64>,
    pub client_name: Option<String>,
    #[cfg_attr(
        feature = "validation",
        validate(email(message = "Valid email is required"))
    )]
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub counsellor_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateConsultationRequest {
    #[serde(rename = "type")]
    pub consultation_type: Option<String>,
    pub status: Option<String>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    #[serde(deserialize_with = "crate::common::lenient_f64::deserialize")]
    pub price: Option<f64>,
    pub counsellor_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
    pub notes: Option<String>,
    pub outcome_notes: Option<String>,
}
