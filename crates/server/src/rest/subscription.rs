use axum::{extract::State, http::StatusCode, Json};
use sqlx::{Pool, Postgres};

use shared_types::{
    ApiResponse, AppError, ErrorResponse, SubscribeRequest, Subscription, UnsubscribeRequest,
};

use crate::auth::SuperAdmin;
use crate::error_convert::ValidateRequest;
use crate::repo;

/// POST /api/subscriptions/subscribe
#[utoipa::path(
    post,
    path = "/api/subscriptions/subscribe",
    request_body = SubscribeRequest,
    responses(
        (status = 201, description = "Subscribed", body = ApiResponse<Subscription>),
        (status = 200, description = "Already subscribed or resubscribed", body = ApiResponse<Subscription>),
        (status = 400, description = "Missing email", body = ErrorResponse)
    ),
    tag = "subscriptions"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn subscribe(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Subscription>>), AppError> {
    let email = body
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::bad_request("Email is required"))?;
    body.validate_request()?;
    let source = body.source.as_deref();

    let (status, message, subscription) = match repo::subscription::find_by_email(&pool, &email).await? {
        None => (
            StatusCode::CREATED,
            "Subscribed",
            repo::subscription::create(&pool, &email, body.user_id, source).await?,
        ),
        Some(existing) if existing.status == "subscribed" => {
            (StatusCode::OK, "Already subscribed", existing)
        }
        Some(existing) => (
            StatusCode::OK,
            "Resubscribed",
            repo::subscription::resubscribe(&pool, existing.id, body.user_id, source).await?,
        ),
    };

    Ok((status, Json(ApiResponse::with_message(message, subscription))))
}

/// POST /api/subscriptions/unsubscribe
#[utoipa::path(
    post,
    path = "/api/subscriptions/unsubscribe",
    request_body = UnsubscribeRequest,
    responses(
        (status = 200, description = "Unsubscribed", body = ApiResponse<Subscription>),
        (status = 400, description = "Neither id nor email", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "subscriptions"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn unsubscribe(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<UnsubscribeRequest>,
) -> Result<Json<ApiResponse<Subscription>>, AppError> {
    let email = body
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    if body.id.is_none() && email.is_none() {
        return Err(AppError::bad_request("Provide id or email to unsubscribe"));
    }

    let subscription = repo::subscription::unsubscribe(&pool, body.id, email.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("Subscription not found"))?;
    Ok(Json(ApiResponse::with_message("Unsubscribed", subscription)))
}

/// GET /api/subscriptions
#[utoipa::path(
    get,
    path = "/api/subscriptions",
    responses(
        (status = 200, description = "Subscriptions, newest first", body = ApiResponse<Vec<Subscription>>),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "subscriptions"
)]
pub async fn list_subscriptions(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
) -> Result<Json<ApiResponse<Vec<Subscription>>>, AppError> {
    Ok(Json(ApiResponse::ok(repo::subscription::list(&pool).await?)))
}
