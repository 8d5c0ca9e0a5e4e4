use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    parse_date_input, ApiResponse, AppError, CaseInquiry, ErrorResponse, InquiryDocument,
    InquiryForm, InquiryStatusRequest, InquiryUploadForm, MessageResponse, INQUIRY_STATUSES,
    MAX_INQUIRY_FILES,
};

use super::upload::{read_form, UploadForm, UploadedFile};
use crate::auth::{MaybeUser, Staff, SuperAdmin};
use crate::repo;
use crate::storage::{DocumentStore, ObjectStore};

const INQUIRY_PREFIX: &str = "inquiries";

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

fn inquiry_form(upload: &UploadForm) -> InquiryForm {
    let mut form = InquiryForm::default();
    for (name, value) in &upload.fields {
        form.set(name, value.clone());
    }
    form
}

/// Store every attachment. A file that fails to store is logged and left out
/// so the inquiry itself still goes through.
async fn store_documents(store: &DocumentStore, files: Vec<UploadedFile>) -> Vec<InquiryDocument> {
    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        let key = file.storage_key(INQUIRY_PREFIX);
        let size = file.bytes.len() as i64;
        match store.put(&key, file.bytes, &file.content_type).await {
            Ok(url) => documents.push(InquiryDocument {
                name: file.original_name,
                path: url,
                filename: UploadedFile::stored_name(&key),
                mimetype: file.content_type,
                size,
            }),
            Err(e) => {
                tracing::error!(error = %e, file = %file.original_name, "Failed to store inquiry attachment");
            }
        }
    }
    documents
}

/// POST /api/case-inquiries
#[utoipa::path(
    post,
    path = "/api/case-inquiries",
    request_body(content = InquiryUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Inquiry submitted", body = ApiResponse<CaseInquiry>),
        (status = 400, description = "Missing fields or rejected attachment", body = ErrorResponse)
    ),
    tag = "case-inquiries"
)]
#[tracing::instrument(skip(pool, store, caller, multipart))]
pub async fn create_inquiry(
    State(pool): State<Pool<Postgres>>,
    State(store): State<DocumentStore>,
    MaybeUser(caller): MaybeUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<CaseInquiry>>), AppError> {
    let upload = read_form(multipart, "documents", MAX_INQUIRY_FILES).await?;
    let form = inquiry_form(&upload);

    let missing = form.missing_required();
    if !missing.is_empty() {
        return Err(AppError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    let preferred_date = form.preferred_date.as_deref().and_then(parse_date_input);

    let documents = store_documents(&store, upload.files).await;
    let documents = serde_json::to_value(&documents)
        .map_err(|e| AppError::internal(format!("Failed to record documents: {e}")))?;

    let inquiry = repo::inquiry::create(&pool, &form, preferred_date, documents).await?;
    tracing::info!(
        inquiry_id = %inquiry.id,
        submitted_by = ?caller.as_ref().map(|c| c.id()),
        "Case inquiry submitted"
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Case inquiry submitted successfully",
            inquiry,
        )),
    ))
}

/// GET /api/case-inquiries
#[utoipa::path(
    get,
    path = "/api/case-inquiries",
    responses(
        (status = 200, description = "Inquiries, newest first", body = ApiResponse<Vec<CaseInquiry>>),
        (status = 403, description = "Clients may not list inquiries", body = ErrorResponse)
    ),
    tag = "case-inquiries"
)]
pub async fn list_inquiries(
    State(pool): State<Pool<Postgres>>,
    Staff(_caller): Staff,
) -> Result<Json<ApiResponse<Vec<CaseInquiry>>>, AppError> {
    Ok(Json(ApiResponse::ok(repo::inquiry::list(&pool).await?)))
}

/// PUT /api/case-inquiries/{id}/status
#[utoipa::path(
    put,
    path = "/api/case-inquiries/{id}/status",
    params(("id" = String, Path, description = "Inquiry UUID")),
    request_body = InquiryStatusRequest,
    responses(
        (status = 200, description = "Inquiry updated", body = ApiResponse<CaseInquiry>),
        (status = 400, description = "Invalid status", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "case-inquiries"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_inquiry_status(
    State(pool): State<Pool<Postgres>>,
    Staff(_caller): Staff,
    Path(id): Path<String>,
    Json(body): Json<InquiryStatusRequest>,
) -> Result<Json<ApiResponse<CaseInquiry>>, AppError> {
    let status = body.status.as_deref().filter(|s| !s.is_empty());
    if let Some(status) = status {
        if !INQUIRY_STATUSES.contains(&status) {
            return Err(AppError::bad_request(format!(
                "Invalid status. Valid values: {}",
                INQUIRY_STATUSES.join(", ")
            )));
        }
    }

    let inquiry = repo::inquiry::update_status(
        &pool,
        parse_id(&id)?,
        status,
        body.admin_notes.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Inquiry not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Inquiry updated successfully",
        inquiry,
    )))
}

/// DELETE /api/case-inquiries/{id}
#[utoipa::path(
    delete,
    path = "/api/case-inquiries/{id}",
    params(("id" = String, Path, description = "Inquiry UUID")),
    responses(
        (status = 200, description = "Inquiry deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "case-inquiries"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_inquiry(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !repo::inquiry::delete(&pool, parse_id(&id)?).await? {
        return Err(AppError::not_found("Inquiry not found"));
    }
    Ok(Json(MessageResponse::new("Inquiry deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_fields_fill_the_form() {
        let mut upload = UploadForm::default();
        upload.fields.insert("firstName".into(), "Mariam".into());
        upload.fields.insert("title".into(), "Rental dispute".into());
        upload.fields.insert("ignored".into(), "x".into());

        let form = inquiry_form(&upload);
        assert_eq!(form.first_name.as_deref(), Some("Mariam"));
        assert_eq!(form.title.as_deref(), Some("Rental dispute"));
        assert_eq!(
            form.missing_required(),
            vec!["lastName", "email", "phone", "description"]
        );
    }
}
