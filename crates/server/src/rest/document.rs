use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    ApiResponse, AppError, Document, DocumentUploadForm, DocumentView, ErrorResponse,
    MessageResponse,
};

use super::case::{load_case, parse_case_id};
use super::upload::{read_form, UploadedFile};
use crate::auth::{roles, AuthUser, Authorized};
use crate::repo;
use crate::repo::document::NewDocument;
use crate::storage::{DocumentStore, ObjectStore};

const DEFAULT_CATEGORY: &str = "general";

/// POST /api/documents/upload
#[utoipa::path(
    post,
    path = "/api/documents/upload",
    request_body(content = DocumentUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Document stored", body = ApiResponse<Document>),
        (status = 400, description = "Missing, oversized or disallowed file", body = ErrorResponse),
        (status = 404, description = "Case not found", body = ErrorResponse)
    ),
    tag = "documents"
)]
#[tracing::instrument(skip(pool, store, caller, multipart))]
pub async fn upload_document(
    State(pool): State<Pool<Postgres>>,
    State(store): State<DocumentStore>,
    AuthUser(caller): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Document>>), AppError> {
    let mut form = read_form(multipart, "file", 1).await?;
    let file = form
        .files
        .pop()
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    let case_id = form
        .text("caseId")
        .ok_or_else(|| AppError::bad_request("caseId is required"))?;
    let case = load_case(&pool, parse_case_id(&case_id)?).await?;

    let key = file.storage_key(&format!("cases/{}", case.case_number));
    let file_size = file.bytes.len() as i64;
    let url = store
        .put(&key, file.bytes, &file.content_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key = %key, "Object store write failed");
            AppError::internal("Failed to store file")
        })?;

    let document = repo::document::create(
        &pool,
        &NewDocument {
            case_id: case.id,
            uploaded_by: caller.id(),
            file_name: UploadedFile::stored_name(&key),
            original_file_name: file.original_name,
            file_type: file.content_type,
            file_size,
            file_path: key,
            file_url: url,
            category: form
                .text("category")
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            description: form.text("description"),
        },
    )
    .await?;

    tracing::info!(document_id = %document.id, case_id = %case.id, "Document uploaded");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Document uploaded successfully",
            document,
        )),
    ))
}

/// GET /api/documents/case/{case_id}
#[utoipa::path(
    get,
    path = "/api/documents/case/{case_id}",
    params(("case_id" = String, Path, description = "Case UUID")),
    responses(
        (status = 200, description = "Documents, newest first", body = ApiResponse<Vec<DocumentView>>)
    ),
    tag = "documents"
)]
pub async fn list_case_documents(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(case_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<DocumentView>>>, AppError> {
    let documents = repo::document::list_for_case(&pool, parse_case_id(&case_id)?).await?;
    let ids: Vec<Uuid> = documents.iter().map(|d| d.uploaded_by).collect();
    let uploaders = repo::user::summaries_by_ids(&pool, &ids).await?;

    let views = documents
        .into_iter()
        .map(|document| DocumentView {
            uploader: repo::user::pick(&uploaders, Some(document.uploaded_by)).map(|mut u| {
                u.phone = None;
                u
            }),
            document,
        })
        .collect();
    Ok(Json(ApiResponse::ok(views)))
}

/// DELETE /api/documents/{id}
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    params(("id" = String, Path, description = "Document UUID")),
    responses(
        (status = 200, description = "Document deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "documents"
)]
#[tracing::instrument(skip(pool, store, _caller))]
pub async fn delete_document(
    State(pool): State<Pool<Postgres>>,
    State(store): State<DocumentStore>,
    Authorized(_caller): Authorized<{ roles::ADMIN_OR_COORDINATOR }>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::bad_request("Invalid UUID format"))?;
    let document = repo::document::find_by_id(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Document not found"))?;

    if let Err(e) = store.delete(&document.file_path).await {
        tracing::error!(error = %e, key = %document.file_path, "Failed to remove stored document");
    }
    repo::document::delete(&pool, document.id).await?;

    Ok(Json(MessageResponse::new("Document deleted successfully")))
}
