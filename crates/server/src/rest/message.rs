use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    ApiResponse, AppError, CreateMessageRequest, ErrorResponse, Message, MessageListParams,
    MessageResponse, MessageStatusRequest, MessageView, ReplyRequest, Role, UnreadCount,
    MESSAGE_PRIORITIES, MESSAGE_STATUSES,
};

use super::case::author;
use crate::auth::{AuthUser, CurrentUser, SuperAdmin};
use crate::repo;
use crate::repo::message::MessageFilter;

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

async fn load_message(pool: &Pool<Postgres>, id: Uuid) -> Result<Message, AppError> {
    repo::message::find_by_id(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))
}

async fn views(pool: &Pool<Postgres>, messages: Vec<Message>) -> Result<Vec<MessageView>, AppError> {
    let mut client_ids: Vec<Uuid> = messages.iter().map(|m| m.client_id).collect();
    client_ids.sort();
    client_ids.dedup();
    let replier_ids: Vec<Uuid> = messages.iter().filter_map(|m| m.replied_by).collect();

    let clients = repo::message::clients_with_cases(pool, &client_ids).await?;
    let repliers = repo::user::summaries_by_ids(pool, &replier_ids).await?;

    Ok(messages
        .into_iter()
        .map(|message| MessageView {
            client: clients.get(&message.client_id).cloned(),
            replier: author(repo::user::pick(&repliers, message.replied_by)),
            message,
        })
        .collect())
}

async fn view(pool: &Pool<Postgres>, message: Message) -> Result<MessageView, AppError> {
    views(pool, vec![message])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Message not found"))
}

/// Opening a message clears whichever unread flag belongs to the reader.
fn read_marker(caller: &CurrentUser, message: &Message) -> Option<Role> {
    match caller.role {
        Role::SuperAdmin if !message.is_read => Some(Role::SuperAdmin),
        Role::Client if message.admin_reply.is_some() && !message.client_read => Some(Role::Client),
        _ => None,
    }
}

/// POST /api/messages
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = ApiResponse<Message>),
        (status = 400, description = "Missing subject or message", body = ErrorResponse)
    ),
    tag = "messages"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_message(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Message>>), AppError> {
    let (Some(subject), Some(text)) = (required(&body.subject), required(&body.message)) else {
        return Err(AppError::bad_request("Subject and message are required"));
    };
    let priority = match required(&body.priority) {
        None => "medium",
        Some(p) if MESSAGE_PRIORITIES.contains(&p) => p,
        Some(_) => {
            return Err(AppError::bad_request(format!(
                "Invalid priority. Valid values: {}",
                MESSAGE_PRIORITIES.join(", ")
            )))
        }
    };

    let message = repo::message::create(&pool, caller.id(), subject, text, priority).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Message sent successfully", message)),
    ))
}

/// GET /api/messages
#[utoipa::path(
    get,
    path = "/api/messages",
    params(MessageListParams),
    responses((status = 200, description = "Messages, newest first", body = ApiResponse<Vec<MessageView>>)),
    tag = "messages"
)]
pub async fn list_messages(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Query(params): Query<MessageListParams>,
) -> Result<Json<ApiResponse<Vec<MessageView>>>, AppError> {
    let filter = MessageFilter {
        client_id: (caller.role == Role::Client).then(|| caller.id()),
        status: params.status.filter(|s| !s.is_empty() && s != "all"),
        priority: params.priority.filter(|p| !p.is_empty() && p != "all"),
        search: params.search,
    };
    let messages = repo::message::list(&pool, &filter).await?;
    Ok(Json(ApiResponse::ok(views(&pool, messages).await?)))
}

/// GET /api/messages/unread-count
#[utoipa::path(
    get,
    path = "/api/messages/unread-count",
    responses((status = 200, description = "Unread messages for the caller", body = ApiResponse<UnreadCount>)),
    tag = "messages"
)]
pub async fn unread_count(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ApiResponse<UnreadCount>>, AppError> {
    let unread_count = match caller.role {
        Role::SuperAdmin => repo::message::unread_by_admin(&pool).await?,
        Role::Client => repo::message::unread_replies(&pool, caller.id()).await?,
        _ => 0,
    };
    Ok(Json(ApiResponse::ok(UnreadCount { unread_count })))
}

/// GET /api/messages/{id}
#[utoipa::path(
    get,
    path = "/api/messages/{id}",
    params(("id" = String, Path, description = "Message UUID")),
    responses(
        (status = 200, description = "Message with sender and replier", body = ApiResponse<MessageView>),
        (status = 403, description = "Another client's message", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn get_message(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageView>>, AppError> {
    let mut message = load_message(&pool, parse_id(&id)?).await?;
    if caller.role == Role::Client && message.client_id != caller.id() {
        return Err(AppError::forbidden("Access denied"));
    }

    message = match read_marker(&caller, &message) {
        Some(Role::SuperAdmin) => repo::message::mark_read_by_admin(&pool, message.id).await?,
        Some(_) => repo::message::mark_read_by_client(&pool, message.id).await?,
        None => message,
    };
    Ok(Json(ApiResponse::ok(view(&pool, message).await?)))
}

/// POST /api/messages/{id}/reply
#[utoipa::path(
    post,
    path = "/api/messages/{id}/reply",
    params(("id" = String, Path, description = "Message UUID")),
    request_body = ReplyRequest,
    responses(
        (status = 200, description = "Reply sent", body = ApiResponse<MessageView>),
        (status = 400, description = "Empty reply", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "messages"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn reply_message(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<ReplyRequest>,
) -> Result<Json<ApiResponse<MessageView>>, AppError> {
    let reply = required(&body.admin_reply)
        .ok_or_else(|| AppError::bad_request("Reply message is required"))?;
    let message = repo::message::reply(&pool, parse_id(&id)?, reply, caller.id())
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Reply sent successfully",
        view(&pool, message).await?,
    )))
}

/// PUT /api/messages/{id}/status
#[utoipa::path(
    put,
    path = "/api/messages/{id}/status",
    params(("id" = String, Path, description = "Message UUID")),
    request_body = MessageStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Message>),
        (status = 400, description = "Invalid status", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "messages"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn update_message_status(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<MessageStatusRequest>,
) -> Result<Json<ApiResponse<Message>>, AppError> {
    let status = body
        .status
        .as_deref()
        .filter(|s| MESSAGE_STATUSES.contains(s))
        .ok_or_else(|| AppError::bad_request("Invalid status"))?;
    let message = repo::message::set_status(&pool, parse_id(&id)?, status)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;
    Ok(Json(ApiResponse::with_message("Message status updated", message)))
}

/// DELETE /api/messages/{id}
#[utoipa::path(
    delete,
    path = "/api/messages/{id}",
    params(("id" = String, Path, description = "Message UUID")),
    responses(
        (status = 200, description = "Message deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "messages"
)]
#[tracing::instrument(skip(pool, _caller))]
pub async fn delete_message(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !repo::message::delete(&pool, parse_id(&id)?).await? {
        return Err(AppError::not_found("Message not found"));
    }
    Ok(Json(MessageResponse::new("Message deleted successfully")))
}
