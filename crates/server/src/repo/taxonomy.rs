//! Case types, their categories and sub-categories.

use std::collections::HashMap;

use shared_types::{
    AppError, CaseCategory, CaseSubCategory, CaseType, CaseTypeExport, CaseTypeRef,
    CaseTypeTree, CategoryExport, CategoryView, CategoryWithSubs, SubCategoryExport,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

// ── Case types ──────────────────────────────────────────────────────

/// Case-insensitive name clash with another case type.
pub async fn type_name_taken(
    pool: &Pool<Postgres>,
    name: &str,
    exclude: Option<Uuid>,
) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM case_types
            WHERE LOWER(name) = LOWER($1) AND ($2::UUID IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(name)
    .bind(exclude)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn type_code_taken(
    pool: &Pool<Postgres>,
    code: &str,
    exclude: Option<Uuid>,
) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM case_types
            WHERE LOWER(code) = LOWER($1) AND ($2::UUID IS NULL OR id <> $2)
        )
        "#,
    )
    .bind(code)
    .bind(exclude)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn create_type(
    pool: &Pool<Postgres>,
    name: &str,
    code: &str,
    is_active: bool,
    created_by: Uuid,
) -> Result<CaseType, AppError> {
    sqlx::query_as::<_, CaseType>(
        r#"
        INSERT INTO case_types (name, code, is_active, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(code)
    .bind(is_active)
    .bind(created_by)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_type(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<CaseType>, AppError> {
    sqlx::query_as::<_, CaseType>("SELECT * FROM case_types WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update_type(
    pool: &Pool<Postgres>,
    id: Uuid,
    name: Option<&str>,
    code: Option<&str>,
    is_active: Option<bool>,
) -> Result<Option<CaseType>, AppError> {
    sqlx::query_as::<_, CaseType>(
        r#"
        UPDATE case_types SET
            name      = COALESCE($2, name),
            code      = COALESCE($3, code),
            is_active = COALESCE($4, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(code)
    .bind(is_active)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Deletes the type and its categories. Returns the number of categories
/// removed, or `None` when the type did not exist.
pub async fn delete_type(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<i64>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let categories: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM case_categories WHERE case_type_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

    let result = sqlx::query("DELETE FROM case_types WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok((result.rows_affected() > 0).then_some(categories))
}

/// Types with nested categories and sub-categories, ordered by name at each
/// level. Inactive rows are dropped at every level unless requested.
pub async fn type_trees(
    pool: &Pool<Postgres>,
    include_inactive: bool,
    only: Option<Uuid>,
) -> Result<Vec<CaseTypeTree>, AppError> {
    let types = sqlx::query_as::<_, CaseType>(
        r#"
        SELECT * FROM case_types
        WHERE ($1 OR is_active) AND ($2::UUID IS NULL OR id = $2)
        ORDER BY name
        "#,
    )
    .bind(include_inactive)
    .bind(only)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let ids: Vec<Uuid> = types.iter().map(|t| t.id).collect();
    let categories = sqlx::query_as::<_, CaseCategory>(
        r#"
        SELECT * FROM case_categories
        WHERE case_type_id = ANY($1) AND ($2 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(&ids)
    .bind(include_inactive)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let category_ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
    let mut subs = sub_categories_by_parent(pool, &category_ids, include_inactive).await?;

    let mut by_type: HashMap<Uuid, Vec<CategoryWithSubs>> = HashMap::new();
    for category in categories {
        let sub_categories = subs.remove(&category.id).unwrap_or_default();
        by_type
            .entry(category.case_type_id)
            .or_default()
            .push(CategoryWithSubs {
                category,
                sub_categories,
            });
    }

    Ok(types
        .into_iter()
        .map(|case_type| CaseTypeTree {
            categories: by_type.remove(&case_type.id).unwrap_or_default(),
            case_type,
        })
        .collect())
}

async fn sub_categories_by_parent(
    pool: &Pool<Postgres>,
    category_ids: &[Uuid],
    include_inactive: bool,
) -> Result<HashMap<Uuid, Vec<CaseSubCategory>>, AppError> {
    let rows = sqlx::query_as::<_, CaseSubCategory>(
        r#"
        SELECT * FROM case_sub_categories
        WHERE category_id = ANY($1) AND ($2 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(category_ids)
    .bind(include_inactive)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let mut map: HashMap<Uuid, Vec<CaseSubCategory>> = HashMap::new();
    for row in rows {
        map.entry(row.category_id).or_default().push(row);
    }
    Ok(map)
}

pub async fn type_refs(
    pool: &Pool<Postgres>,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, CaseTypeRef>, AppError> {
    let rows = sqlx::query_as::<_, CaseTypeRef>(
        "SELECT id, name, code FROM case_types WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows.into_iter().map(|r| (r.id, r)).collect())
}

// ── Categories ──────────────────────────────────────────────────────

pub async fn create_category(
    pool: &Pool<Postgres>,
    name: &str,
    case_type_id: Uuid,
    is_active: bool,
) -> Result<CaseCategory, AppError> {
    sqlx::query_as::<_, CaseCategory>(
        r#"
        INSERT INTO case_categories (name, case_type_id, is_active)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(case_type_id)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_category(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<CaseCategory>, AppError> {
    sqlx::query_as::<_, CaseCategory>("SELECT * FROM case_categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Categories with their parent type and sub-categories.
/// `active_only` restricts every level to active rows.
pub async fn category_views(
    pool: &Pool<Postgres>,
    case_type_id: Option<Uuid>,
    active_only: bool,
) -> Result<Vec<CategoryView>, AppError> {
    let categories = sqlx::query_as::<_, CaseCategory>(
        r#"
        SELECT * FROM case_categories
        WHERE ($1::UUID IS NULL OR case_type_id = $1) AND (NOT $2 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(case_type_id)
    .bind(active_only)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let type_ids: Vec<Uuid> = categories.iter().map(|c| c.case_type_id).collect();
    let types = type_refs(pool, &type_ids).await?;
    let category_ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
    let mut subs = sub_categories_by_parent(pool, &category_ids, !active_only).await?;

    Ok(categories
        .into_iter()
        .map(|category| CategoryView {
            case_type: types.get(&category.case_type_id).cloned(),
            sub_categories: subs.remove(&category.id).unwrap_or_default(),
            category,
        })
        .collect())
}

pub async fn update_category(
    pool: &Pool<Postgres>,
    id: Uuid,
    name: Option<&str>,
    case_type_id: Option<Uuid>,
    is_active: Option<bool>,
) -> Result<Option<CaseCategory>, AppError> {
    sqlx::query_as::<_, CaseCategory>(
        r#"
        UPDATE case_categories SET
            name         = COALESCE($2, name),
            case_type_id = COALESCE($3, case_type_id),
            is_active    = COALESCE($4, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(case_type_id)
    .bind(is_active)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Returns the number of sub-categories removed with it.
pub async fn delete_category(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<i64>, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let subs: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM case_sub_categories WHERE category_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

    let result = sqlx::query("DELETE FROM case_categories WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok((result.rows_affected() > 0).then_some(subs))
}

// ── Sub-categories ──────────────────────────────────────────────────

pub async fn create_sub_category(
    pool: &Pool<Postgres>,
    name: &str,
    category_id: Uuid,
    is_active: bool,
) -> Result<CaseSubCategory, AppError> {
    sqlx::query_as::<_, CaseSubCategory>(
        r#"
        INSERT INTO case_sub_categories (name, category_id, is_active)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(category_id)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_sub_category(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<CaseSubCategory>, AppError> {
    sqlx::query_as::<_, CaseSubCategory>("SELECT * FROM case_sub_categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

pub async fn list_sub_categories(
    pool: &Pool<Postgres>,
    category_id: Option<Uuid>,
    active_only: bool,
) -> Result<Vec<CaseSubCategory>, AppError> {
    sqlx::query_as::<_, CaseSubCategory>(
        r#"
        SELECT * FROM case_sub_categories
        WHERE ($1::UUID IS NULL OR category_id = $1) AND (NOT $2 OR is_active)
        ORDER BY name
        "#,
    )
    .bind(category_id)
    .bind(active_only)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn categories_by_ids(
    pool: &Pool<Postgres>,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, CaseCategory>, AppError> {
    let rows = sqlx::query_as::<_, CaseCategory>("SELECT * FROM case_categories WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows.into_iter().map(|r| (r.id, r)).collect())
}

pub async fn update_sub_category(
    pool: &Pool<Postgres>,
    id: Uuid,
    name: Option<&str>,
    category_id: Option<Uuid>,
    is_active: Option<bool>,
) -> Result<Option<CaseSubCategory>, AppError> {
    sqlx::query_as::<_, CaseSubCategory>(
        r#"
        UPDATE case_sub_categories SET
            name        = COALESCE($2, name),
            category_id = COALESCE($3, category_id),
            is_active   = COALESCE($4, is_active)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(category_id)
    .bind(is_active)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete_sub_category(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM case_sub_categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

// ── Name resolution ─────────────────────────────────────────────────

/// Cases store taxonomy ids as text. Map whichever of them exist to names,
/// looking across all three levels.
pub async fn names_by_ids(
    pool: &Pool<Postgres>,
    ids: &[String],
) -> Result<HashMap<String, String>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT id::TEXT, name FROM case_types WHERE id::TEXT = ANY($1)
        UNION ALL
        SELECT id::TEXT, name FROM case_categories WHERE id::TEXT = ANY($1)
        UNION ALL
        SELECT id::TEXT, name FROM case_sub_categories WHERE id::TEXT = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows.into_iter().collect())
}

// ── Export ──────────────────────────────────────────────────────────

pub async fn export_types(pool: &Pool<Postgres>) -> Result<Vec<CaseTypeExport>, AppError> {
    sqlx::query_as::<_, CaseTypeExport>(
        r#"
        SELECT id, name, code,
               CASE WHEN is_active THEN 'Yes' ELSE 'No' END AS is_active,
               created_at
        FROM case_types
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn export_categories(pool: &Pool<Postgres>) -> Result<Vec<CategoryExport>, AppError> {
    sqlx::query_as::<_, CategoryExport>(
        r#"
        SELECT c.id, c.name, c.case_type_id,
               t.name AS case_type_name, t.code AS case_type_code,
               CASE WHEN c.is_active THEN 'Yes' ELSE 'No' END AS is_active,
               c.created_at
        FROM case_categories c
        JOIN case_types t ON t.id = c.case_type_id
        ORDER BY t.name, c.name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn export_sub_categories(
    pool: &Pool<Postgres>,
) -> Result<Vec<SubCategoryExport>, AppError> {
    sqlx::query_as::<_, SubCategoryExport>(
        r#"
        SELECT s.id, s.name, s.category_id,
               c.name AS category_name,
               t.name AS case_type_name, t.code AS case_type_code,
               CASE WHEN s.is_active THEN 'Yes' ELSE 'No' END AS is_active,
               s.created_at
        FROM case_sub_categories s
        JOIN case_categories c ON c.id = s.category_id
        JOIN case_types t ON t.id = c.case_type_id
        ORDER BY t.name, c.name, s.name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

// ── Import ──────────────────────────────────────────────────────────

/// Insert or update a case type keyed by its code.
pub async fn upsert_type_by_code(
    pool: &Pool<Postgres>,
    name: &str,
    code: &str,
    is_active: bool,
    created_by: Uuid,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO case_types (name, code, is_active, created_by)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (code) DO UPDATE SET
            name      = EXCLUDED.name,
            is_active = EXCLUDED.is_active
        "#,
    )
    .bind(name)
    .bind(code)
    .bind(is_active)
    .bind(created_by)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Insert a category, or refresh the active flag of the one with the same
/// name under the same type.
pub async fn upsert_category(
    pool: &Pool<Postgres>,
    name: &str,
    case_type_id: Uuid,
    is_active: bool,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        "UPDATE case_categories SET is_active = $3 WHERE name = $1 AND case_type_id = $2",
    )
    .bind(name)
    .bind(case_type_id)
    .bind(is_active)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    if updated.rows_affected() == 0 {
        create_category(pool, name, case_type_id, is_active).await?;
    }
    Ok(())
}

pub async fn upsert_sub_category(
    pool: &Pool<Postgres>,
    name: &str,
    category_id: Uuid,
    is_active: bool,
) -> Result<(), AppError> {
    let updated = sqlx::query(
        "UPDATE case_sub_categories SET is_active = $3 WHERE name = $1 AND category_id = $2",
    )
    .bind(name)
    .bind(category_id)
    .bind(is_active)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    if updated.rows_affected() == 0 {
        create_sub_category(pool, name, category_id, is_active).await?;
    }
    Ok(())
}
