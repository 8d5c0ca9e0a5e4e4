//! Case audit trail. Each case numbers its entries 1, 2, 3, ... in insertion order.

use chrono::NaiveDate;
use shared_types::{parse_date_input, AppError, CaseTracking, TrackingEntryRequest};
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// One entry to append. Manual entries also carry the follow-up fields.
#[derive(Debug, Clone, Default)]
pub struct TrackingEntry {
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
}

impl TrackingEntry {
    pub fn change(
        change_type: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            change_type: change_type.into(),
            old_value,
            new_value,
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn manual(req: &TrackingEntryRequest, author: &str) -> Self {
        Self {
            change_type: "manual_entry".into(),
            description: Some(format!("Manual tracking entry added by {author}")),
            next_hearing: req.next_hearing.as_deref().and_then(parse_date_input),
            reason: req.reason.clone(),
            action_required: req.action_required.clone(),
            date_of_action_required: req
                .date_of_action_required
                .as_deref()
                .and_then(parse_date_input),
            work_undertaken: req.work_undertaken.clone(),
            other: req.other.clone(),
            staff_name: req.staff_name.clone(),
            ..Default::default()
        }
    }
}

/// Append inside an open transaction. The case row is locked so concurrent
/// writers queue up instead of racing for the same change number.
pub async fn append(
    conn: &mut PgConnection,
    case_id: Uuid,
    user_id: Uuid,
    entry: &TrackingEntry,
) -> Result<CaseTracking, AppError> {
    sqlx::query("SELECT id FROM cases WHERE id = $1 FOR UPDATE")
        .bind(case_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(SqlxErrorExt::into_app_error)?
        .ok_or_else(|| AppError::not_found("Case not found"))?;

    let next: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(change_number), 0) + 1 FROM case_tracking WHERE case_id = $1",
    )
    .bind(case_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    sqlx::query_as::<_, CaseTracking>(
        r#"
        INSERT INTO case_tracking
            (case_id, user_id, change_number, change_type, old_value, new_value,
             description, next_hearing, reason, action_required,
             date_of_action_required, work_undertaken, other, staff_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *
        "#,
    )
    .bind(case_id)
    .bind(user_id)
    .bind(next)
    .bind(&entry.change_type)
    .bind(&entry.old_value)
    .bind(&entry.new_value)
    .bind(&entry.description)
    .bind(entry.next_hearing)
    .bind(&entry.reason)
    .bind(&entry.action_required)
    .bind(entry.date_of_action_required)
    .bind(&entry.work_undertaken)
    .bind(&entry.other)
    .bind(&entry.staff_name)
    .fetch_one(&mut *conn)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Append in a transaction of its own.
pub async fn record(
    pool: &Pool<Postgres>,
    case_id: Uuid,
    user_id: Uuid,
    entry: &TrackingEntry,
) -> Result<CaseTracking, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    let row = append(&mut tx, case_id, user_id, entry).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(row)
}

/// Newest first.
pub async fn list_for_case(
    pool: &Pool<Postgres>,
    case_id: Uuid,
) -> Result<Vec<CaseTracking>, AppError> {
    sqlx::query_as::<_, CaseTracking>(
        r#"
        SELECT * FROM case_tracking
        WHERE case_id = $1
        ORDER BY change_number DESC
        "#,
    )
    .bind(case_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Edit the follow-up fields of an entry. The change number and type never change.
pub async fn update(
    pool: &Pool<Postgres>,
    case_id: Uuid,
    id: Uuid,
    req: &TrackingEntryRequest,
) -> Result<Option<CaseTracking>, AppError> {
    sqlx::query_as::<_, CaseTracking>(
        r#"
        UPDATE case_tracking SET
            next_hearing            = COALESCE($3, next_hearing),
            reason                  = COALESCE($4, reason),
            action_required         = COALESCE($5, action_required),
            date_of_action_required = COALESCE($6, date_of_action_required),
            work_undertaken         = COALESCE($7, work_undertaken),
            other                   = COALESCE($8, other),
            staff_name              = COALESCE($9, staff_name),
            description             = COALESCE($10, description)
        WHERE id = $1 AND case_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(case_id)
    .bind(req.next_hearing.as_deref().and_then(parse_date_input))
    .bind(req.reason.as_deref())
    .bind(req.action_required.as_deref())
    .bind(req.date_of_action_required.as_deref().and_then(parse_date_input))
    .bind(req.work_undertaken.as_deref())
    .bind(req.other.as_deref())
    .bind(req.staff_name.as_deref())
    .bind(req.description.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, case_id: Uuid, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM case_tracking WHERE id = $1 AND case_id = $2")
        .bind(id)
        .bind(case_id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_entry_parses_dates_and_names_author() {
        let req = TrackingEntryRequest {
            next_hearing: Some("2025-09-01".into()),
            date_of_action_required: Some("not a date".into()),
            reason: Some("Adjourned".into()),
            ..Default::default()
        };
        let entry = TrackingEntry::manual(&req, "Huda");
        assert_eq!(entry.change_type, "manual_entry");
        assert_eq!(
            entry.description.as_deref(),
            Some("Manual tracking entry added by Huda")
        );
        assert_eq!(entry.next_hearing, NaiveDate::from_ymd_opt(2025, 9, 1));
        assert_eq!(entry.date_of_action_required, None);
        assert_eq!(entry.reason.as_deref(), Some("Adjourned"));
    }

    #[test]
    fn change_entry_carries_values() {
        let entry = TrackingEntry::change(
            "status_change",
            Some("pending".into()),
            Some("active".into()),
            "Status changed from pending to active",
        );
        assert_eq!(entry.old_value.as_deref(), Some("pending"));
        assert!(entry.next_hearing.is_none());
    }
}
