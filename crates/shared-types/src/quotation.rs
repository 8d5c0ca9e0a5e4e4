use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::common::UserSummary;

pub const QUOTATION_REVIEW_STATUSES: &[&str] = &["approved", "rejected"];

/// A counsellor's fee quotation for taking a case to court.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CourtQuotation {
    pub id: Uuid,
    pub case_number: String,
    pub emirate: String,
    pub court: String,
    pub client_name: String,
    pub client_contact: Option<String>,
    pub fee_amount: f64,
    pub notes: Option<String>,
    pub status: String,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_date: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub rejection_reason: Option<String>,
    pub attachments: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QuotationView {
    #[serde(flatten)]
    pub quotation: CourtQuotation,
    pub creator: Option<UserSummary>,
    pub approver: Option<UserSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CreateQuotationRequest {
    pub case_number: Option<String>,
    pub emirate: Option<String>,
    pub court: Option<String>,
    pub client_name: Option<String>,
    pub client_contact: Option<String>,
    #[serde(deserialize_with = "crate::common::lenient_f64::deserialize")]
    pub fee_amount: Option<f64>,
    pub notes: Option<String>,
    pub attachments: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[serde(rename_all = "camelCase")]
pub struct QuotationListParams {
    pub status: Option<String>,
    pub emirate: Option<String>,
    pub created_by: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
