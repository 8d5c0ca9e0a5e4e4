use axum::{extract::State, Json};
use serde_json::json;
use sqlx::{Pool, Postgres};

use shared_types::{
    ApiResponse, AppError, ErrorResponse, NotificationResult, SendEmailRequest, SendTextRequest,
};

use crate::auth::Staff;
use crate::{mailgun, repo, twilio};

fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::bad_request(message))
}

/// Record the attempt whether or not the gateway accepted it.
async fn record_delivery(
    pool: &Pool<Postgres>,
    body: &SendTextRequest,
    kind: &str,
    outcome: Result<String, String>,
    recipient: &str,
    message: &str,
) -> Result<Json<ApiResponse<NotificationResult>>, AppError> {
    let (error, metadata) = match &outcome {
        Ok(sid) => (None, json!({ "to": recipient, "sid": sid })),
        Err(e) => {
            tracing::warn!(error = %e, kind, "Notification delivery failed");
            (Some(e.as_str()), json!({ "to": recipient }))
        }
    };
    let notification =
        repo::notification::record(pool, body.user_id, kind, message, error, Some(metadata))
            .await?;
    Ok(Json(ApiResponse::ok(NotificationResult { notification })))
}

/// POST /api/notifications/sms
#[utoipa::path(
    post,
    path = "/api/notifications/sms",
    request_body = SendTextRequest,
    responses(
        (status = 200, description = "Delivery recorded", body = ApiResponse<NotificationResult>),
        (status = 400, description = "Missing phone or message", body = ErrorResponse)
    ),
    tag = "notifications"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn send_sms(
    State(pool): State<Pool<Postgres>>,
    Staff(_caller): Staff,
    Json(body): Json<SendTextRequest>,
) -> Result<Json<ApiResponse<NotificationResult>>, AppError> {
    let phone = required(&body.phone, "Phone and message are required")?;
    let message = required(&body.message, "Phone and message are required")?;
    let outcome = twilio::send_sms(phone, message).await;
    record_delivery(&pool, &body, "sms", outcome, phone, message).await
}

/// POST /api/notifications/whatsapp
#[utoipa::path(
    post,
    path = "/api/notifications/whatsapp",
    request_body = SendTextRequest,
    responses(
        (status = 200, description = "Delivery recorded", body = ApiResponse<NotificationResult>),
        (status = 400, description = "Missing phone or message", body = ErrorResponse)
    ),
    tag = "notifications"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn send_whatsapp(
    State(pool): State<Pool<Postgres>>,
    Staff(_caller): Staff,
    Json(body): Json<SendTextRequest>,
) -> Result<Json<ApiResponse<NotificationResult>>, AppError> {
    let phone = required(&body.phone, "Phone and message are required")?;
    let message = required(&body.message, "Phone and message are required")?;
    let outcome = twilio::send_whatsapp(phone, message).await;
    let recipient = twilio::whatsapp_address(phone);
    record_delivery(&pool, &body, "whatsapp", outcome, &recipient, message).await
}

/// POST /api/notifications/email
#[utoipa::path(
    post,
    path = "/api/notifications/email",
    request_body = SendEmailRequest,
    responses(
        (status = 200, description = "Delivery recorded", body = ApiResponse<NotificationResult>),
        (status = 400, description = "Missing email, subject or body", body = ErrorResponse)
    ),
    tag = "notifications"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn send_email(
    State(pool): State<Pool<Postgres>>,
    Staff(_caller): Staff,
    Json(body): Json<SendEmailRequest>,
) -> Result<Json<ApiResponse<NotificationResult>>, AppError> {
    const MISSING: &str = "Email, subject, and html are required";
    let to = required(&body.email, MISSING)?;
    let subject = required(&body.subject, MISSING)?;
    let html = required(&body.html, MISSING)?;

    let outcome = mailgun::send_email(to, subject, &mailgun::wrap_html(html)).await;
    if let Err(e) = &outcome {
        tracing::warn!(error = %e, "Email notification failed");
    }
    let notification = repo::notification::record(
        &pool,
        body.user_id,
        "email",
        subject,
        outcome.as_ref().err().map(String::as_str),
        Some(json!({ "to": to })),
    )
    .await?;
    Ok(Json(ApiResponse::ok(NotificationResult { notification })))
}
