use shared_types::{
    AppError, Case, CoordinatorDashboard, CounsellorDashboard, LawyerContact, LawyerDashboard,
    SuperAdminDashboard,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

const ACTIVE: &str = "status IN ('active', 'in_progress')";

pub async fn super_admin(pool: &Pool<Postgres>) -> Result<SuperAdminDashboard, AppError> {
    let row: (i64, i64, f64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM cases),
            (SELECT COUNT(*) FROM users),
            (SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM payments),
            (SELECT COUNT(*) FROM cases WHERE status = 'pending')
        "#,
    )
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(SuperAdminDashboard {
        total_cases: row.0,
        total_users: row.1,
        total_revenue: row.2,
        pending_cases: row.3,
    })
}

pub async fn coordinator(pool: &Pool<Postgres>, user_id: Uuid) -> Result<CoordinatorDashboard, AppError> {
    let row: (i64, i64, i64) = sqlx::query_as(&format!(
        r#"
        SELECT
            COUNT(*),
            COUNT(*) FILTER (WHERE lawyer_id IS NULL),
            COUNT(*) FILTER (WHERE {ACTIVE})
        FROM cases
        WHERE coordinator_id = $1
        "#
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(CoordinatorDashboard {
        my_cases: row.0,
        pending_assignment: row.1,
        active_cases: row.2,
    })
}

pub async fn lawyer(pool: &Pool<Postgres>, user_id: Uuid) -> Result<LawyerDashboard, AppError> {
    let row: (i64, i64) = sqlx::query_as(&format!(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE {ACTIVE}) FROM cases WHERE lawyer_id = $1"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(LawyerDashboard {
        assigned_cases: row.0,
        active_cases: row.1,
    })
}

pub async fn counsellor(pool: &Pool<Postgres>, user_id: Uuid) -> Result<CounsellorDashboard, AppError> {
    let row: (i64, i64) = sqlx::query_as(&format!(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE {ACTIVE}) FROM cases WHERE counsellor_id = $1"
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(CounsellorDashboard {
        total_cases: row.0,
        active_cases: row.1,
    })
}

/// The client's most recent case and its lawyer's contact details.
pub async fn client_latest_case(
    pool: &Pool<Postgres>,
    client_id: Uuid,
) -> Result<Option<(Case, Option<LawyerContact>)>, AppError> {
    let Some(case) = crate::repo::case::latest_for_client(pool, client_id).await? else {
        return Ok(None);
    };

    let lawyer = match case.lawyer_id {
        Some(lawyer_id) => sqlx::query_as::<_, LawyerContact>(
            "SELECT name, email, phone FROM users WHERE id = $1",
        )
        .bind(lawyer_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?,
        None => None,
    };

    Ok(Some((case, lawyer)))
}
