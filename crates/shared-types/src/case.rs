use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::common::{Pagination, UserSummary};
use crate::document::DocumentView;
use crate::payment::Payment;
use crate::user::UserResponse;

// ── Validation constants ────────────────────────────────────────────

/// Valid case status values matching the DB CHECK constraint.
pub const CASE_STATUSES: &[&str] = &[
    "pending",
    "active",
    "in_progress",
    "on_hold",
    "completed",
    "closed",
    "rejected",
];

pub const APPROVAL_STATUSES: &[&str] = &["pending", "approved", "rejected"];

pub const URGENCY_LEVELS: &[&str] = &["low", "medium", "high", "critical"];

pub fn is_valid_case_status(s: &str) -> bool {
    CASE_STATUSES.contains(&s)
}

pub fn is_valid_approval_status(s: &str) -> bool {
    APPROVAL_STATUSES.contains(&s)
}

pub fn is_valid_urgency(s: &str) -> bool {
    URGENCY_LEVELS.contains(&s)
}

// ── DB row struct ───────────────────────────────────────────────────

/// A legal case record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: Uuid,
    pub case_number: String,
    pub client_id: Uuid,
    pub coordinator_id: Uuid,
    pub counsellor_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    pub client_name: String,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub emirates_id: Option<String>,
    pub nationality: Option<String>,
    pub whatsapp_number: Option<String>,
    pub landline_number: Option<String>,
    pub company_address: Option<String>,
    pub company_number: Option<String>,
    pub company_email: Option<String>,
    pub occupation: Option<Value>,
    pub employer_name: Option<String>,
    pub employer_number: Option<String>,
    pub employer_address: Option<String>,
    pub salary: Option<f64>,
    pub last_day_of_work: Option<NaiveDate>,
    pub still_on_duty: Option<String>,
    pub work_period_start: Option<NaiveDate>,
    pub work_period_end: Option<NaiveDate>,
    pub family_member_name: Option<String>,
    pub family_member_number: Option<String>,
    pub friend_name: Option<String>,
    pub friend_number: Option<String>,
    pub case_type: Option<String>,
    pub case_category: Option<String>,
    pub case_sub_category: Option<String>,
    pub emirate: Option<String>,
    pub court_area: Option<String>,
    pub description: Option<String>,
    pub urgency_level: String,
    pub status: String,
    pub approval_status: String,
    pub registration_date: DateTime<Utc>,
    pub hearing_date: Option<NaiveDate>,
    pub next_hearing_date: Option<NaiveDate>,
    pub closed_date: Option<DateTime<Utc>>,
    pub estimated_cost: f64,
    pub paid_amount: f64,
    pub remaining_amount: f64,
    pub notes: Option<String>,
    pub reference_source: Option<String>,
    pub reference_other_details: Option<String>,
    pub region_group: Option<String>,
    pub title: Option<String>,
    pub signature: Option<String>,
    pub jail_visiting: bool,
    pub date_of_endorsement: Option<NaiveDate>,
    pub jail_name: Option<String>,
    pub date_of_arrest: Option<NaiveDate>,
    pub report_number: Option<String>,
    pub date_of_visiting: Option<NaiveDate>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── API response types ──────────────────────────────────────────────

/// A case with its participants and, on the detail endpoint, its history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CaseView {
    #[serde(flatten)]
    pub case: Case,
    pub client: Option<UserSummary>,
    pub coordinator: Option<UserSummary>,
    pub lawyer: Option<UserSummary>,
    pub counsellor: Option<UserSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_records: Option<Vec<TrackingView>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expenses: Option<Vec<CaseExpense>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<Payment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentView>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CasePage {
    pub cases: Vec<CaseView>,
    pub pagination: Pagination,
}

/// Result of registering a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct RegisteredCase {
    pub case: Case,
    pub client: UserResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

// ── Request types ───────────────────────────────────────────────────

/// Case registration body. Dates are accepted as `YYYY-MM-DD` or RFC 3339.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterCaseRequest {
    pub client_name: Option<String>,
    pub client_email: Option<String>,
    pub client_phone: Option<String>,
    pub client_mobile: Option<String>,
    pub emirates_id: Option<String>,
    pub nationality: Option<String>,
    pub whatsapp_number: Option<String>,
    pub landline_number: Option<String>,
    pub company_address: Option<String>,
    pub company_number: Option<String>,
    pub company_email: Option<String>,
    /// A list of occupation names, or a single string.
    pub occupation: Option<Value>,
    pub employer_name: Option<String>,
    pub employer_number: Option<String>,
    pub employer_address: Option<String>,
    #[serde(deserialize_with = "crate::common::lenient_f64::deserialize")]
    pub salary: Option<f64>,
    pub last_day_of_work: Option<String>,
    pub still_on_duty: Option<String>,
    pub work_period_start: Option<String>,
    pub work_period_end: Option<String>,
    pub family_member_name: Option<String>,
    pub family_member_number: Option<String>,
    pub friend_name: Option<String>,
    pub friend_number: Option<String>,
    pub case_type: Option<String>,
    pub case_category: Option<String>,
    pub case_sub_category: Option<String>,
    pub emirate: Option<String>,
    pub court_area: Option<String>,
    pub description: Option<String>,
    pub urgency_level: Option<String>,
    pub hearing_date: Option<String>,
    pub next_hearing_date: Option<String>,
    #[serde(deserialize_with = "crate::common::lenient_f64::deserialize")]
    pub estimated_cost: Option<f64>,
    pub notes: Option<String>,
    pub reference_source: Option<String>,
    pub reference_other_details: Option<String>,
    pub region_group: Option<String>,
    pub title: Option<String>,
    pub signature: Option<String>,
    pub jail_visiting: Option<bool>,
    pub date_of_endorsement: Option<String>,
    pub jail_name: Option<String>,
    pub date_of_arrest: Option<String>,
    pub report_number: Option<String>,
    pub date_of_visiting: Option<String>,
    pub lawyer_id: Option<Uuid>,
    pub counsellor_id: Option<Uuid>,
}

impl RegisterCaseRequest {
    /// `clientPhone` wins over `clientMobile`.
    pub fn contact_phone(&self) -> Option<&str> {
        [self.client_phone.as_deref(), self.client_mobile.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|p| !p.is_empty())
    }

    /// Occupations joined for the client's profile.
    pub fn occupation_text(&self) -> Option<String> {
        occupation_text(self.occupation.as_ref())
    }
}

/// Occupation values arrive as an array of names or a plain string.
pub fn occupation_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => {
            let names: Vec<String> = items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect();
            (!names.is_empty()).then(|| names.join(", "))
        }
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct CaseListParams {
    pub status: Option<String>,
    pub emirate: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AssignLawyerRequest {
    #[serde(default)]
    pub lawyer_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CaseStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AddNoteRequest {
    #[serde(default)]
    pub note: Option<String>,
}

// ── Client search ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ClientSearchParams {
    pub query: Option<String>,
}

/// Client details assembled from the account and the latest case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClientLookup {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub client_number: Option<String>,
    pub emirates_id: Option<String>,
    pub nationality: Option<String>,
    pub whatsapp_number: Option<String>,
    pub landline_number: Option<String>,
    pub company_address: Option<String>,
    pub company_number: Option<String>,
    pub company_email: Option<String>,
    pub occupation: Option<Value>,
    pub employer_name: Option<String>,
    pub employer_number: Option<String>,
    pub employer_address: Option<String>,
    pub salary: Option<f64>,
    pub family_member_name: Option<String>,
    pub family_member_number: Option<String>,
    pub friend_name: Option<String>,
    pub friend_number: Option<String>,
}

/// One line in a client's case history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CaseBrief {
    pub id: Uuid,
    pub case_number: String,
    pub case_type: Option<String>,
    pub case_category: Option<String>,
    pub case_sub_category: Option<String>,
    pub status: String,
    pub emirate: Option<String>,
    pub registration_date: DateTime<Utc>,
    pub lawyer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClientSearchResult {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientLookup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cases: Vec<CaseBrief>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cases: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_registered_client: Option<bool>,
}

impl ClientSearchResult {
    pub fn not_found() -> Self {
        Self {
            found: false,
            client: None,
            cases: Vec::new(),
            total_cases: None,
            is_registered_client: None,
        }
    }
}

// ── Tracking ────────────────────────────────────────────────────────

/// One entry in a case's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CaseTracking {
    pub id: Uuid,
    pub case_id: Uuid,
    pub user_id: Uuid,
    pub change_number: i32,
    pub change_type: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub description: Option<String>,
    pub next_hearing: Option<NaiveDate>,
    pub reason: Option<String>,
    pub action_required: Option<String>,
    pub date_of_action_required: Option<NaiveDate>,
    pub work_undertaken: Option<String>,
    pub other: Option<String>,
    pub staff_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TrackingView {
    #[serde(flatten)]
    pub record: CaseTracking,
    pub user: Option<UserSummary>,
}

/// Manual tracking entry fields. Also used for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingEntryRequest {
    pub next_hearing: Option<String>,
    pub reason: Option<String>,
    pub action_required: Option<String>,
    pub date_of_action_required: Option<String>,
    pub work_undertaken: Option<String>,
    pub other: Option<String>,
    pub staff_name: Option<String>,
    pub description: Option<String>,
}

// ── Expenses ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CaseExpense {
    pub id: Uuid,
    pub case_id: Uuid,
    pub date: NaiveDate,
    pub expense: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default)]
pub struct ExpenseRequest {
    pub date: Option<String>,
    pub expense: Option<String>,
    #[serde(deserialize_with = "crate::common::lenient_f64::deserialize")]
    pub amount: Option<f64>,
}

// ── Case payments ───────────────────────────────────────────────────

/// Payment recorded against a case from the office ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CasePaymentRequest {
    pub date: Option<String>,
    pub payment_type: Option<String>,
    #[serde(deserialize_with = "crate::common::lenient_f64::deserialize")]
    pub amount: Option<f64>,
    pub being: Option<String>,
    pub bank: Option<String>,
    pub cheque_number: Option<String>,
    pub cheque_date: Option<String>,
}

impl CasePaymentRequest {
    /// Free-text ledger note stored with the payment.
    pub fn ledger_note(&self) -> String {
        format!(
            "Being: {} | Bank: {} | Cheque Date: {}",
            self.being.as_deref().unwrap_or(""),
            self.bank.as_deref().unwrap_or(""),
            self.cheque_date.as_deref().unwrap_or("")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_lists() {
        assert!(is_valid_case_status("in_progress"));
        assert!(!is_valid_case_status("filed"));
        assert!(is_valid_urgency("critical"));
        assert!(is_valid_approval_status("approved"));
    }

    #[test]
    fn contact_phone_prefers_client_phone() {
        let req = RegisterCaseRequest {
            client_phone: Some("  ".into()),
            client_mobile: Some("0501112222".into()),
            ..Default::default()
        };
        assert_eq!(req.contact_phone(), Some("0501112222"));

        let req = RegisterCaseRequest {
            client_phone: Some("042223333".into()),
            client_mobile: Some("0501112222".into()),
            ..Default::default()
        };
        assert_eq!(req.contact_phone(), Some("042223333"));
    }

    #[test]
    fn occupation_joins_list() {
        assert_eq!(
            occupation_text(Some(&json!(["Driver", " Cook ", ""]))),
            Some("Driver, Cook".to_string())
        );
        assert_eq!(occupation_text(Some(&json!("Nurse"))), Some("Nurse".into()));
        assert_eq!(occupation_text(Some(&json!([]))), None);
        assert_eq!(occupation_text(None), None);
    }

    #[test]
    fn register_request_accepts_string_amounts() {
        let req: RegisterCaseRequest = serde_json::from_value(json!({
            "clientName": "A",
            "estimatedCost": "1500.5",
            "salary": 3000
        }))
        .unwrap();
        assert_eq!(req.estimated_cost, Some(1500.5));
        assert_eq!(req.salary, Some(3000.0));
    }

    #[test]
    fn ledger_note_format() {
        let req = CasePaymentRequest {
            being: Some("Court fee".into()),
            bank: Some("ENBD".into()),
            ..Default::default()
        };
        assert_eq!(req.ledger_note(), "Being: Court fee | Bank: ENBD | Cheque Date: ");
    }
}
