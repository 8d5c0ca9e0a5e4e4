//! Multipart form reading shared by the document and inquiry endpoints.

use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::Utc;

use shared_types::{invalid_file_type_message, is_allowed_upload_type, AppError, MAX_UPLOAD_BYTES};

use crate::helpers::sanitize_file_name;

/// A validated file part held in memory until it is written to the object store.
#[derive(Debug)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// `{prefix}/{timestamp}-{sanitized name}`.
    pub fn storage_key(&self, prefix: &str) -> String {
        let mut name = sanitize_file_name(&self.original_name);
        if name.is_empty() {
            name = "file".to_string();
        }
        format!("{prefix}/{}-{name}", Utc::now().timestamp_millis())
    }

    pub fn stored_name(key: &str) -> String {
        key.rsplit('/').next().unwrap_or(key).to_string()
    }
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Read every part. Parts carrying a file name are files and must pass the type
/// and size checks; everything else is a text field.
pub async fn read_form(
    mut multipart: Multipart,
    file_field: &str,
    max_files: usize,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let Some(original_name) = field.file_name().map(str::to_string) else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::bad_request(e.to_string()))?;
            form.fields.insert(name, value);
            continue;
        };
        if name != file_field {
            continue;
        }
        if form.files.len() >= max_files {
            return Err(AppError::bad_request(format!(
                "Too many files. Maximum is {max_files}."
            )));
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if !is_allowed_upload_type(&content_type) {
            return Err(AppError::bad_request(invalid_file_type_message()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(e.to_string()))?;
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::bad_request("File too large. Maximum size is 10MB."));
        }

        form.files.push(UploadedFile {
            original_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Ok(form)
}
