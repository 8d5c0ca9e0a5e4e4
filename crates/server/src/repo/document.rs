use shared_types::{AppError, Document};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Metadata of a stored upload.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub case_id: Uuid,
    pub uploaded_by: Uuid,
    pub file_name: String,
    pub original_file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub file_path: String,
    pub file_url: String,
    pub category: String,
    pub description: Option<String>,
}

pub async fn create(pool: &Pool<Postgres>, doc: &NewDocument) -> Result<Document, AppError> {
    sqlx::query_as::<_, Document>(
        r#"
        INSERT INTO documents
            (case_id, uploaded_by, file_name, original_file_name, file_type,
             file_size, file_path, file_url, category, description)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(doc.case_id)
    .bind(doc.uploaded_by)
    .bind(&doc.file_name)
    .bind(&doc.original_file_name)
    .bind(&doc.file_type)
    .bind(doc.file_size)
    .bind(&doc.file_path)
    .bind(&doc.file_url)
    .bind(&doc.category)
    .bind(doc.description.as_deref())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<Document>, AppError> {
    sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list_for_case(pool: &Pool<Postgres>, case_id: Uuid) -> Result<Vec<Document>, AppError> {
    sqlx::query_as::<_, Document>(
        "SELECT * FROM documents WHERE case_id = $1 ORDER BY created_at DESC",
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM documents WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}
