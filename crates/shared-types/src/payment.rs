use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const PAYMENT_STATUSES: &[&str] = &["pending", "completed", "failed", "refunded"];

/// A payment or invoice line. Case ledger entries and client-initiated
/// payments share this table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub case_id: Option<Uuid>,
    pub client_id: Uuid,
    pub consultation_id: Option<Uuid>,
    pub amount: f64,
    pub currency: String,
    pub payment_method: Option<String>,
    pub status: String,
    pub transaction_id: Option<String>,
    pub gateway_response: Option<Value>,
    pub invoice_number: Option<String>,
    pub invoice_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePaymentRequest {
    pub case_id: Option<Uuid>,
    pub consultation_id: Option<Uuid>,
    #[serde(deserialize_with = "crate::common::lenient_f64::deserialize")]
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}
