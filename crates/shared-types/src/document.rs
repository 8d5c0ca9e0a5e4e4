use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::UserSummary;

// ---------------------------------------------------------------------------
// Upload rules
// ---------------------------------------------------------------------------

/// MIME types accepted for case documents and inquiry attachments.
pub const ALLOWED_UPLOAD_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
];

/// 10 MB.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Inquiry forms accept at most this many files.
pub const MAX_INQUIRY_FILES: usize = 10;

pub fn is_allowed_upload_type(content_type: &str) -> bool {
    ALLOWED_UPLOAD_TYPES.contains(&content_type)
}

pub fn invalid_file_type_message() -> String {
    format!(
        "Invalid file type. Allowed types: {}",
        ALLOWED_UPLOAD_TYPES.join(", ")
    )
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// Metadata for a file attached to a case. The bytes live in the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub case_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub original_file_name: String,
    pub file_type: String,
    pub file_size: i64,
    /// Object-store key.
    pub file_path: String,
    pub file_url: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub uploader: Option<UserSummary>,
}

/// Multipart form accepted by the upload endpoint (documented shape only).
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct DocumentUploadForm {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Binary))]
    pub file: String,
    pub case_id: Uuid,
    pub category: Option<String>,
    pub description: Option<String>,
}
