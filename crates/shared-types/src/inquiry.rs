use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const INQUIRY_STATUSES: &[&str] = &["pending", "reviewed", "converted", "rejected"];
pub const INQUIRY_URGENCIES: &[&str] = &["low", "medium", "high", "urgent"];
pub const CONSULTATION_PREFERENCES: &[&str] = &["office", "video", "phone"];

/// A prospective client's case inquiry from the public website.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CaseInquiry {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub emirates_id: Option<String>,
    pub case_type: Option<String>,
    pub title: String,
    pub description: String,
    pub urgency: String,
    /// `[{name, path, filename, mimetype, size}]`
    pub documents: Value,
    pub consultation_preference: String,
    pub preferred_date: Option<NaiveDate>,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata for one uploaded inquiry attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InquiryDocument {
    pub name: String,
    pub path: String,
    pub filename: String,
    pub mimetype: String,
    pub size: i64,
}

/// Text fields of the inquiry form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct InquiryForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub emirates_id: Option<String>,
    pub case_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub urgency: Option<String>,
    pub consultation_preference: Option<String>,
    pub preferred_date: Option<String>,
}

impl InquiryForm {
    /// Assign a multipart text field by its form name. Unknown names are ignored.
    pub fn set(&mut self, field: &str, value: String) {
        let slot = match field {
            "firstName" => &mut self.first_name,
            "lastName" => &mut self.last_name,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "emiratesId" => &mut self.emirates_id,
            "caseType" => &mut self.case_type,
            "title" => &mut self.title,
            "description" => &mut self.description,
            "urgency" => &mut self.urgency,
            "consultationPreference" => &mut self.consultation_preference,
            "preferredDate" => &mut self.preferred_date,
            _ => return,
        };
        *slot = Some(value);
    }

    /// Names of required fields that are missing or blank.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("title", &self.title),
            ("description", &self.description),
        ]
        .into_iter()
        .filter(|(_, v)| v.as_deref().map(str::trim).unwrap_or("").is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Multipart body of a public inquiry submission, for the API docs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InquiryUploadForm {
    #[serde(flatten)]
    pub fields: InquiryForm,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>, format = Binary))]
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct InquiryStatusRequest {
    pub status: Option<String>,
    pub admin_notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_fields_are_assigned_by_wire_name() {
        let mut form = InquiryForm::default();
        form.set("firstName", "Ali".into());
        form.set("preferredDate", "2025-06-01".into());
        form.set("unknown", "x".into());
        assert_eq!(form.first_name.as_deref(), Some("Ali"));
        assert_eq!(form.preferred_date.as_deref(), Some("2025-06-01"));
    }

    #[test]
    fn missing_required_lists_blank_fields() {
        let mut form = InquiryForm::default();
        form.set("firstName", "Ali".into());
        form.set("lastName", " ".into());
        assert_eq!(
            form.missing_required(),
            vec!["lastName", "email", "phone", "title", "description"]
        );
    }
}
