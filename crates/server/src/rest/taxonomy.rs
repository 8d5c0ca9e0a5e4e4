use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    import_flag_is_active, ApiResponse, AppError, CaseCategory, CaseSubCategory, CaseType,
    CaseTypeExport, CaseTypeRequest, CaseTypeTree, CascadeDeleted, CategoryExport,
    CategoryRef, CategoryRequest, CategoryView, ErrorResponse, ImportResults,
    IncludeInactiveParams, MessageResponse, SubCategoryExport, SubCategoryRequest,
    SubCategoryView,
};

use super::import::{self, Row};
use crate::auth::{AuthUser, SuperAdmin};
use crate::repo;

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn ensure_type_exists(pool: &Pool<Postgres>, id: Uuid) -> Result<CaseType, AppError> {
    repo::taxonomy::find_type(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Case type not found"))
}

async fn ensure_category_exists(pool: &Pool<Postgres>, id: Uuid) -> Result<CaseCategory, AppError> {
    repo::taxonomy::find_category(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))
}

async fn check_type_uniqueness(
    pool: &Pool<Postgres>,
    name: Option<&str>,
    code: Option<&str>,
    exclude: Option<Uuid>,
) -> Result<(), AppError> {
    if let Some(name) = name {
        if repo::taxonomy::type_name_taken(pool, name, exclude).await? {
            return Err(AppError::bad_request("Case type with this name already exists"));
        }
    }
    if let Some(code) = code {
        if repo::taxonomy::type_code_taken(pool, code, exclude).await? {
            return Err(AppError::bad_request("Case type with this code already exists"));
        }
    }
    Ok(())
}

// ── Case types ──────────────────────────────────────────────────────

/// POST /api/case-types
#[utoipa::path(
    post,
    path = "/api/case-types",
    request_body = CaseTypeRequest,
    responses(
        (status = 201, description = "Case type created", body = ApiResponse<CaseType>),
        (status = 400, description = "Missing or duplicate name/code", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_case_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Json(body): Json<CaseTypeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CaseType>>), AppError> {
    let (Some(name), Some(code)) = (trimmed(&body.name), trimmed(&body.code)) else {
        return Err(AppError::bad_request("Name and code are required"));
    };
    check_type_uniqueness(&pool, Some(name), Some(code), None).await?;

    let case_type = repo::taxonomy::create_type(
        &pool,
        name,
        code,
        body.is_active.unwrap_or(true),
        caller.id(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Case type created successfully", case_type)),
    ))
}

/// GET /api/case-types
#[utoipa::path(
    get,
    path = "/api/case-types",
    params(IncludeInactiveParams),
    responses(
        (status = 200, description = "Types with nested categories", body = ApiResponse<Vec<CaseTypeTree>>)
    ),
    tag = "taxonomy"
)]
pub async fn list_case_types(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Query(params): Query<IncludeInactiveParams>,
) -> Result<Json<ApiResponse<Vec<CaseTypeTree>>>, AppError> {
    let trees = repo::taxonomy::type_trees(&pool, params.include_inactive(), None).await?;
    Ok(Json(ApiResponse::ok(trees)))
}

/// GET /api/case-types/{id}
#[utoipa::path(
    get,
    path = "/api/case-types/{id}",
    params(("id" = String, Path, description = "Case type UUID")),
    responses(
        (status = 200, description = "Type with nested categories", body = ApiResponse<CaseTypeTree>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
pub async fn get_case_type(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CaseTypeTree>>, AppError> {
    let tree = repo::taxonomy::type_trees(&pool, true, Some(parse_id(&id)?))
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Case type not found"))?;
    Ok(Json(ApiResponse::ok(tree)))
}

/// PUT /api/case-types/{id}
#[utoipa::path(
    put,
    path = "/api/case-types/{id}",
    params(("id" = String, Path, description = "Case type UUID")),
    request_body = CaseTypeRequest,
    responses(
        (status = 200, description = "Case type updated", body = ApiResponse<CaseType>),
        (status = 400, description = "Duplicate name/code", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_case_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<CaseTypeRequest>,
) -> Result<Json<ApiResponse<CaseType>>, AppError> {
    let id = parse_id(&id)?;
    let current = ensure_type_exists(&pool, id).await?;

    let name = trimmed(&body.name).filter(|n| *n != current.name);
    let code = trimmed(&body.code).filter(|c| *c != current.code);
    check_type_uniqueness(&pool, name, code, Some(id)).await?;

    let case_type = repo::taxonomy::update_type(&pool, id, name, code, body.is_active)
        .await?
        .ok_or_else(|| AppError::not_found("Case type not found"))?;
    Ok(Json(ApiResponse::with_message("Case type updated successfully", case_type)))
}

/// DELETE /api/case-types/{id}
#[utoipa::path(
    delete,
    path = "/api/case-types/{id}",
    params(("id" = String, Path, description = "Case type UUID")),
    responses(
        (status = 200, description = "Case type and its categories deleted", body = ApiResponse<CascadeDeleted>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_case_type(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CascadeDeleted>>, AppError> {
    let deleted = repo::taxonomy::delete_type(&pool, parse_id(&id)?)
        .await?
        .ok_or_else(|| AppError::not_found("Case type not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Case type deleted successfully",
        CascadeDeleted {
            deleted_categories: Some(deleted),
            ..Default::default()
        },
    )))
}

// ── Categories ──────────────────────────────────────────────────────

/// POST /api/case-categories
#[utoipa::path(
    post,
    path = "/api/case-categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CaseCategory>),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 404, description = "Case type not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn create_category(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Json(body): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CaseCategory>>), AppError> {
    let (Some(name), Some(case_type_id)) = (trimmed(&body.name), body.case_type_id) else {
        return Err(AppError::bad_request("Name and case type ID are required"));
    };
    ensure_type_exists(&pool, case_type_id).await?;

    let category = repo::taxonomy::create_category(
        &pool,
        name,
        case_type_id,
        body.is_active.unwrap_or(true),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Category created successfully", category)),
    ))
}

/// GET /api/case-categories
#[utoipa::path(
    get,
    path = "/api/case-categories",
    responses(
        (status = 200, description = "Categories with parent and sub-categories", body = ApiResponse<Vec<CategoryView>>)
    ),
    tag = "taxonomy"
)]
pub async fn list_categories(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<CategoryView>>>, AppError> {
    Ok(Json(ApiResponse::ok(
        repo::taxonomy::category_views(&pool, None, false).await?,
    )))
}

/// GET /api/case-categories/by-type/{case_type_id}
#[utoipa::path(
    get,
    path = "/api/case-categories/by-type/{case_type_id}",
    params(("case_type_id" = String, Path, description = "Case type UUID")),
    responses(
        (status = 200, description = "Active categories of the type", body = ApiResponse<Vec<CategoryView>>)
    ),
    tag = "taxonomy"
)]
pub async fn categories_by_type(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(case_type_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CategoryView>>>, AppError> {
    let type_id = parse_id(&case_type_id)?;
    Ok(Json(ApiResponse::ok(
        repo::taxonomy::category_views(&pool, Some(type_id), true).await?,
    )))
}

/// PUT /api/case-categories/{id}
#[utoipa::path(
    put,
    path = "/api/case-categories/{id}",
    params(("id" = String, Path, description = "Category UUID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CaseCategory>),
        (status = 404, description = "Category or case type not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_category(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<CategoryRequest>,
) -> Result<Json<ApiResponse<CaseCategory>>, AppError> {
    let id = parse_id(&id)?;
    ensure_category_exists(&pool, id).await?;
    if let Some(type_id) = body.case_type_id {
        ensure_type_exists(&pool, type_id).await?;
    }

    let category = repo::taxonomy::update_category(
        &pool,
        id,
        trimmed(&body.name),
        body.case_type_id,
        body.is_active,
    )
    .await?
    .ok_or_else(|| AppError::not_found("Category not found"))?;
    Ok(Json(ApiResponse::with_message("Category updated successfully", category)))
}

/// DELETE /api/case-categories/{id}
#[utoipa::path(
    delete,
    path = "/api/case-categories/{id}",
    params(("id" = String, Path, description = "Category UUID")),
    responses(
        (status = 200, description = "Category and its sub-categories deleted", body = ApiResponse<CascadeDeleted>),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_category(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<CascadeDeleted>>, AppError> {
    let deleted = repo::taxonomy::delete_category(&pool, parse_id(&id)?)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Category deleted successfully",
        CascadeDeleted {
            deleted_sub_categories: Some(deleted),
            ..Default::default()
        },
    )))
}

// ── Sub-categories ──────────────────────────────────────────────────

async fn sub_category_views(
    pool: &Pool<Postgres>,
    subs: Vec<CaseSubCategory>,
) -> Result<Vec<SubCategoryView>, AppError> {
    let category_ids: Vec<Uuid> = subs.iter().map(|s| s.category_id).collect();
    let categories = repo::taxonomy::categories_by_ids(pool, &category_ids).await?;
    let type_ids: Vec<Uuid> = categories.values().map(|c| c.case_type_id).collect();
    let types = repo::taxonomy::type_refs(pool, &type_ids).await?;

    Ok(subs
        .into_iter()
        .map(|sub_category| SubCategoryView {
            category: categories.get(&sub_category.category_id).map(|c| CategoryRef {
                id: c.id,
                name: c.name.clone(),
                case_type: types.get(&c.case_type_id).cloned(),
            }),
            sub_category,
        })
        .collect())
}

/// POST /api/case-sub-categories
#[utoipa::path(
    post,
    path = "/api/case-sub-categories",
    request_body = SubCategoryRequest,
    responses(
        (status = 201, description = "Sub-category created", body = ApiResponse<CaseSubCategory>),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn create_sub_category(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Json(body): Json<SubCategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CaseSubCategory>>), AppError> {
    let (Some(name), Some(category_id)) = (trimmed(&body.name), body.category_id) else {
        return Err(AppError::bad_request("Name and category ID are required"));
    };
    ensure_category_exists(&pool, category_id).await?;

    let sub = repo::taxonomy::create_sub_category(
        &pool,
        name,
        category_id,
        body.is_active.unwrap_or(true),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Sub-category created successfully", sub)),
    ))
}

/// GET /api/case-sub-categories
#[utoipa::path(
    get,
    path = "/api/case-sub-categories",
    responses(
        (status = 200, description = "Sub-categories with category and type", body = ApiResponse<Vec<SubCategoryView>>)
    ),
    tag = "taxonomy"
)]
pub async fn list_sub_categories(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<SubCategoryView>>>, AppError> {
    let subs = repo::taxonomy::list_sub_categories(&pool, None, false).await?;
    Ok(Json(ApiResponse::ok(sub_category_views(&pool, subs).await?)))
}

/// GET /api/case-sub-categories/by-category/{category_id}
#[utoipa::path(
    get,
    path = "/api/case-sub-categories/by-category/{category_id}",
    params(("category_id" = String, Path, description = "Category UUID")),
    responses(
        (status = 200, description = "Active sub-categories of the category", body = ApiResponse<Vec<CaseSubCategory>>)
    ),
    tag = "taxonomy"
)]
pub async fn sub_categories_by_category(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(category_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<CaseSubCategory>>>, AppError> {
    let category_id = parse_id(&category_id)?;
    Ok(Json(ApiResponse::ok(
        repo::taxonomy::list_sub_categories(&pool, Some(category_id), true).await?,
    )))
}

/// PUT /api/case-sub-categories/{id}
#[utoipa::path(
    put,
    path = "/api/case-sub-categories/{id}",
    params(("id" = String, Path, description = "Sub-category UUID")),
    request_body = SubCategoryRequest,
    responses(
        (status = 200, description = "Sub-category updated", body = ApiResponse<CaseSubCategory>),
        (status = 404, description = "Sub-category or category not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_sub_category(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<SubCategoryRequest>,
) -> Result<Json<ApiResponse<CaseSubCategory>>, AppError> {
    let id = parse_id(&id)?;
    repo::taxonomy::find_sub_category(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Sub-category not found"))?;
    if let Some(category_id) = body.category_id {
        ensure_category_exists(&pool, category_id).await?;
    }

    let sub = repo::taxonomy::update_sub_category(
        &pool,
        id,
        trimmed(&body.name),
        body.category_id,
        body.is_active,
    )
    .await?
    .ok_or_else(|| AppError::not_found("Sub-category not found"))?;
    Ok(Json(ApiResponse::with_message("Sub-category updated successfully", sub)))
}

/// DELETE /api/case-sub-categories/{id}
#[utoipa::path(
    delete,
    path = "/api/case-sub-categories/{id}",
    params(("id" = String, Path, description = "Sub-category UUID")),
    responses(
        (status = 200, description = "Sub-category deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_sub_category(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !repo::taxonomy::delete_sub_category(&pool, parse_id(&id)?).await? {
        return Err(AppError::not_found("Sub-category not found"));
    }
    Ok(Json(MessageResponse::new(
        "Sub-category deleted successfully",
    )))
}

// ── Export ──────────────────────────────────────────────────────────

/// GET /api/export/CaseTypes
#[utoipa::path(
    get,
    path = "/api/export/CaseTypes",
    responses((status = 200, description = "Case type rows", body = Vec<CaseTypeExport>)),
    tag = "taxonomy"
)]
pub async fn export_case_types(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<CaseTypeExport>>, AppError> {
    Ok(Json(repo::taxonomy::export_types(&pool).await?))
}

/// GET /api/export/CaseCategories
#[utoipa::path(
    get,
    path = "/api/export/CaseCategories",
    responses((status = 200, description = "Category rows", body = Vec<CategoryExport>)),
    tag = "taxonomy"
)]
pub async fn export_categories(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<CategoryExport>>, AppError> {
    Ok(Json(repo::taxonomy::export_categories(&pool).await?))
}

/// GET /api/export/CaseSubCategories
#[utoipa::path(
    get,
    path = "/api/export/CaseSubCategories",
    responses((status = 200, description = "Sub-category rows", body = Vec<SubCategoryExport>)),
    tag = "taxonomy"
)]
pub async fn export_sub_categories(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
) -> Result<Json<Vec<SubCategoryExport>>, AppError> {
    Ok(Json(repo::taxonomy::export_sub_categories(&pool).await?))
}

// ── Import ──────────────────────────────────────────────────────────

/// The required name plus the parent id column, or `None` when either is blank.
fn name_and_parent(row: &Row, parent_key: &str) -> Option<(String, Option<Uuid>)> {
    let name = import::text(row, "name")?;
    let raw = import::text(row, parent_key)?;
    Some((name, Uuid::parse_str(&raw).ok()))
}

fn finish(results: ImportResults) -> Json<ApiResponse<ImportResults>> {
    tracing::info!(success = results.success, failed = results.failed, "Import finished");
    Json(ApiResponse::with_message(import::summary(&results), results))
}

/// POST /api/import/CaseTypes
#[utoipa::path(
    post,
    path = "/api/import/CaseTypes",
    request_body = Vec<serde_json::Value>,
    responses(
        (status = 200, description = "Import summary", body = ApiResponse<ImportResults>),
        (status = 400, description = "Not an array, or empty", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn import_case_types(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<ImportResults>>, AppError> {
    let mut results = ImportResults::default();
    for row in import::rows(body, "case types")? {
        let (Some(name), Some(code)) = (import::text(&row, "name"), import::text(&row, "code")) else {
            results.failed += 1;
            results.errors.push(import::missing_fields(&row));
            continue;
        };
        let active = import_flag_is_active(row.get("isActive"));
        match repo::taxonomy::upsert_type_by_code(&pool, &name, &code, active, caller.id()).await {
            Ok(()) => results.success += 1,
            Err(e) => {
                results.failed += 1;
                results.errors.push(format!("Error processing {name}: {}", e.message));
            }
        }
    }
    Ok(finish(results))
}

/// POST /api/import/CaseCategories
#[utoipa::path(
    post,
    path = "/api/import/CaseCategories",
    request_body = Vec<serde_json::Value>,
    responses(
        (status = 200, description = "Import summary", body = ApiResponse<ImportResults>),
        (status = 400, description = "Not an array, or empty", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn import_categories(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<ImportResults>>, AppError> {
    let mut results = ImportResults::default();
    for row in import::rows(body, "categories")? {
        let Some((name, parent_id)) = name_and_parent(&row, "caseTypeId") else {
            results.failed += 1;
            results.errors.push(import::missing_fields(&row));
            continue;
        };
        let parent = match parent_id {
            Some(id) => repo::taxonomy::find_type(&pool, id).await?,
            None => None,
        };
        let Some(parent) = parent else {
            results.failed += 1;
            results.errors.push(format!("Case type not found for: {name}"));
            continue;
        };
        let active = import_flag_is_active(row.get("isActive"));
        match repo::taxonomy::upsert_category(&pool, &name, parent.id, active).await {
            Ok(()) => results.success += 1,
            Err(e) => {
                results.failed += 1;
                results.errors.push(format!("Error processing {name}: {}", e.message));
            }
        }
    }
    Ok(finish(results))
}

/// POST /api/import/CaseSubCategories
#[utoipa::path(
    post,
    path = "/api/import/CaseSubCategories",
    request_body = Vec<serde_json::Value>,
    responses(
        (status = 200, description = "Import summary", body = ApiResponse<ImportResults>),
        (status = 400, description = "Not an array, or empty", body = ErrorResponse)
    ),
    tag = "taxonomy"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn import_sub_categories(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<ImportResults>>, AppError> {
    let mut results = ImportResults::default();
    for row in import::rows(body, "sub-categories")? {
        let Some((name, parent_id)) = name_and_parent(&row, "categoryId") else {
            results.failed += 1;
            results.errors.push(import::missing_fields(&row));
            continue;
        };
        let parent = match parent_id {
            Some(id) => repo::taxonomy::find_category(&pool, id).await?,
            None => None,
        };
        let Some(parent) = parent else {
            results.failed += 1;
            results.errors.push(format!("Category not found for: {name}"));
            continue;
        };
        let active = import_flag_is_active(row.get("isActive"));
        match repo::taxonomy::upsert_sub_category(&pool, &name, parent.id, active).await {
            Ok(()) => results.success += 1,
            Err(e) => {
                results.failed += 1;
                results.errors.push(format!("Error processing {name}: {}", e.message));
            }
        }
    }
    Ok(finish(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn import_rows_need_name_and_parent() {
        let parent = Uuid::new_v4();
        let row = json!({"name": "Wages", "caseTypeId": parent.to_string()});
        let row = row.as_object().unwrap();
        assert_eq!(name_and_parent(row, "caseTypeId"), Some(("Wages".into(), Some(parent))));

        let row = json!({"name": "Wages", "caseTypeId": "not-a-uuid"});
        assert_eq!(
            name_and_parent(row.as_object().unwrap(), "caseTypeId"),
            Some(("Wages".into(), None))
        );

        let row = json!({"name": "Wages"});
        assert_eq!(name_and_parent(row.as_object().unwrap(), "caseTypeId"), None);
    }
}
