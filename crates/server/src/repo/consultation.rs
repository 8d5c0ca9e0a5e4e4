use shared_types::{AppError, Consultation, CreateConsultationRequest, UpdateConsultationRequest};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;

/// Who a consultation list is limited to. Every `None` means "no restriction".
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsultationScope {
    pub client_id: Option<Uuid>,
    pub counsellor_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
}

pub async fn create(
    pool: &Pool<Postgres>,
    client_id: Option<Uuid>,
    req: &CreateConsultationRequest,
) -> Result<Consultation, AppError> {
    sqlx::query_as::<_, Consultation>(
        r#"
        INSERT INTO consultations
            (client_id, counsellor_id, lawyer_id, case_id, type, status,
             scheduled_date, duration, price, client_name, client_email,
             client_phone, notes)
        VALUES ($1, $2, $3, $4, COALESCE($5, 'in_person'), 'pending', $6,
                COALESCE($7, 60), COALESCE($8, 400), $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(client_id)
    .bind(req.counsellor_id)
    .bind(req.lawyer_id)
    .bind(req.case_id)
    .bind(req.consultation_type.as_deref())
    .bind(req.scheduled_date)
    .bind(req.duration)
    .bind(req.price)
    .bind(req.client_name.as_deref().map(str::trim))
    .bind(req.client_email.as_deref().map(|e| e.trim().to_lowercase()))
    .bind(req.client_phone.as_deref().map(str::trim))
    .bind(req.notes.as_deref())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Latest scheduled first.
pub async fn list(
    pool: &Pool<Postgres>,
    scope: ConsultationScope,
) -> Result<Vec<Consultation>, AppError> {
    sqlx::query_as::<_, Consultation>(
        r#"
        SELECT * FROM consultations
        WHERE ($1::UUID IS NULL OR client_id = $1)
          AND ($2::UUID IS NULL OR counsellor_id = $2)
          AND ($3::UUID IS NULL OR lawyer_id = $3)
        ORDER BY scheduled_date DESC
        "#,
    )
    .bind(scope.client_id)
    .bind(scope.counsellor_id)
    .bind(scope.lawyer_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateConsultationRequest,
) -> Result<Option<Consultation>, AppError> {
    sqlx::query_as::<_, Consultation>(
        r#"
        UPDATE consultations SET
            type           = COALESCE($2, type),
            status         = COALESCE($3, status),
            scheduled_date = COALESCE($4, scheduled_date),
            duration       = COALESCE($5, duration),
            price          = COALESCE($6, price),
            counsellor_id  = COALESCE($7, counsellor_id),
            lawyer_id      = COALESCE($8, lawyer_id),
            case_id        = COALESCE($9, case_id),
            notes          = COALESCE($10, notes),
            outcome_notes  = COALESCE($11, outcome_notes)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.consultation_type.as_deref())
    .bind(req.status.as_deref())
    .bind(req.scheduled_date)
    .bind(req.duration)
    .bind(req.price)
    .bind(req.counsellor_id)
    .bind(req.lawyer_id)
    .bind(req.case_id)
    .bind(req.notes.as_deref())
    .bind(req.outcome_notes.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}
