use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    is_valid_consultation_status, is_valid_consultation_type, ApiResponse, AppError, Consultation,
    CreateConsultationRequest, ErrorResponse, Role, UpdateConsultationRequest,
    CONSULTATION_STATUSES, CONSULTATION_TYPES,
};

use crate::auth::{AuthUser, MaybeUser};
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::repo::consultation::ConsultationScope;

fn check_type(value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(t) if !is_valid_consultation_type(t) => Err(AppError::bad_request(format!(
            "Invalid consultation type. Valid values: {}",
            CONSULTATION_TYPES.join(", ")
        ))),
        _ => Ok(()),
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).unwrap_or_default().is_empty()
}

/// POST /api/consultations
#[utoipa::path(
    post,
    path = "/api/consultations",
    request_body = CreateConsultationRequest,
    responses(
        (status = 201, description = "Consultation booked", body = ApiResponse<Consultation>),
        (status = 400, description = "Missing contact details or invalid type", body = ErrorResponse)
    ),
    tag = "consultations"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_consultation(
    State(pool): State<Pool<Postgres>>,
    MaybeUser(caller): MaybeUser,
    Json(body): Json<CreateConsultationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Consultation>>), AppError> {
    if blank(&body.client_name)
        || blank(&body.client_email)
        || blank(&body.client_phone)
        || body.scheduled_date.is_none()
    {
        return Err(AppError::bad_request(
            "Client name, email, phone, and scheduled date are required",
        ));
    }
    body.validate_request()?;
    check_type(body.consultation_type.as_deref())?;

    let consultation =
        repo::consultation::create(&pool, caller.as_ref().map(|c| c.id()), &body).await?;

    tracing::info!(consultation_id = %consultation.id, "Consultation booked");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Consultation booked successfully",
            consultation,
        )),
    ))
}

/// GET /api/consultations
#[utoipa::path(
    get,
    path = "/api/consultations",
    responses(
        (status = 200, description = "Consultations visible to the caller", body = ApiResponse<Vec<Consultation>>)
    ),
    tag = "consultations"
)]
pub async fn list_consultations(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ApiResponse<Vec<Consultation>>>, AppError> {
    let me = Some(caller.id());
    let scope = match caller.role {
        Role::Client => ConsultationScope { client_id: me, ..Default::default() },
        Role::Counsellor => ConsultationScope { counsellor_id: me, ..Default::default() },
        Role::Lawyer => ConsultationScope { lawyer_id: me, ..Default::default() },
        Role::SuperAdmin | Role::Coordinator => ConsultationScope::default(),
    };
    Ok(Json(ApiResponse::ok(
        repo::consultation::list(&pool, scope).await?,
    )))
}

/// PUT /api/consultations/{id}
#[utoipa::path(
    put,
    path = "/api/consultations/{id}",
    params(("id" = String, Path, description = "Consultation UUID")),
    request_body = UpdateConsultationRequest,
    responses(
        (status = 200, description = "Consultation updated", body = ApiResponse<Consultation>),
        (status = 400, description = "Invalid type or status", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "consultations"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_consultation(
    State(pool): State<Pool<Postgres>>,
    AuthUser(_caller): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateConsultationRequest>,
) -> Result<Json<ApiResponse<Consultation>>, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::bad_request("Invalid UUID format"))?;
    check_type(body.consultation_type.as_deref())?;
    if let Some(status) = body.status.as_deref() {
        if !is_valid_consultation_status(status) {
            return Err(AppError::bad_request(format!(
                "Invalid status. Valid values: {}",
                CONSULTATION_STATUSES.join(", ")
            )));
        }
    }

    let consultation = repo::consultation::update(&pool, id, &body)
        .await?
        .ok_or_else(|| AppError::not_found("Consultation not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Consultation updated successfully",
        consultation,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_type_uses_default() {
        assert!(check_type(None).is_ok());
        assert!(check_type(Some("phone")).is_ok());
        let err = check_type(Some("chat")).unwrap_err();
        assert!(err.message.contains("in_person, video, phone"));
    }
}
