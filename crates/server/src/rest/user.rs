use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    import_flag_is_active, is_valid_emirate, AdminResetPasswordRequest, ApiResponse, AppError,
    AssignEmiratesRequest, ChangePasswordRequest, ClientImportResults, ClientProfile,
    CreateUserRequest, CreatedUser, ErrorResponse, LawyerCaseStats, LawyerSummary,
    MessageResponse, NewPassword, PageRequest, Role, UpdateUserRequest, UserListParams, UserPage,
    UserResponse,
};

use crate::auth::password::{ensure_min_length, hash_password, verify_password};
use crate::auth::{ensure_self_or_admin, roles, AuthUser, Authorized, SuperAdmin};
use crate::error_convert::ValidateRequest;
use crate::repo::user::NewUser;
use crate::{helpers, mailgun, repo};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_REPORTED_IMPORT_ERRORS: usize = 10;

fn parse_id(id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// GET /api/users/lawyers
#[utoipa::path(
    get,
    path = "/api/users/lawyers",
    responses(
        (status = 200, description = "Active lawyers", body = ApiResponse<Vec<LawyerSummary>>),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_lawyers(
    State(pool): State<Pool<Postgres>>,
    Authorized(_caller): Authorized<{ roles::ADMIN_OR_COORDINATOR }>,
) -> Result<Json<ApiResponse<Vec<LawyerSummary>>>, AppError> {
    let lawyers = repo::user::active_lawyers(&pool).await?;
    Ok(Json(ApiResponse::ok(lawyers)))
}

/// GET /api/users/case-statistics
#[utoipa::path(
    get,
    path = "/api/users/case-statistics",
    responses(
        (status = 200, description = "Case counts keyed by lawyer id", body = ApiResponse<HashMap<String, LawyerCaseStats>>),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn case_statistics(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
) -> Result<Json<ApiResponse<HashMap<Uuid, LawyerCaseStats>>>, AppError> {
    let stats = repo::user::lawyer_case_stats(&pool).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// POST /api/users
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = ApiResponse<CreatedUser>),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn create_user(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedUser>>), AppError> {
    let (Some(email), Some(name), Some(phone), Some(role)) = (
        trimmed(&body.email),
        trimmed(&body.name),
        trimmed(&body.phone),
        trimmed(&body.role),
    ) else {
        return Err(AppError::bad_request(
            "Email, name, phone, and role are required",
        ));
    };
    body.validate_request()?;
    let role = Role::parse(role).ok_or_else(|| AppError::bad_request("Invalid role"))?;

    if repo::user::find_by_email(&pool, email).await?.is_some() {
        return Err(AppError::conflict("User with this email already exists"));
    }

    let (password, temporary_password) = if role == Role::Client {
        let generated = helpers::generate_random_password();
        (generated.clone(), Some(generated))
    } else {
        let password = body
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::bad_request("Password is required for staff accounts"))?;
        ensure_min_length(password)?;
        (password.to_string(), None)
    };

    let mut new = NewUser::new(email, hash_password(&password)?, name, phone, role.as_str());
    new.created_by = Some(caller.id());
    new.is_active = body.is_active.unwrap_or(true);
    if role.is_emirate_scoped() {
        new.assigned_emirates = Value::from(body.assigned_emirates.clone().unwrap_or_default());
    }
    if role == Role::Lawyer {
        if let Some(specializations) = body.specializations.clone() {
            new.specializations = specializations;
        }
    }
    if role == Role::Coordinator {
        if let Some(permissions) = body.permissions.clone() {
            new.permissions = permissions;
        }
    }
    if role == Role::Client {
        new.client_number = match trimmed(&body.client_number) {
            Some(number) => Some(number.to_string()),
            None => Some(repo::user::generate_client_number(&pool).await?),
        };
        new.profile = body.profile.clone();
    }

    let user = repo::user::create(&pool, new).await?;
    tracing::info!(user_id = %user.id, role = %role, "User created");

    let (subject, html) = mailgun::templates::welcome_credentials(&user.name, &user.email, &password);
    let email_sent = mailgun::try_send(&user.email, &subject, &html).await;
    let message = if email_sent {
        "User created successfully. Login credentials have been emailed."
    } else {
        "User created successfully. The welcome email could not be sent."
    };

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            message,
            CreatedUser {
                user: UserResponse::from(user),
                email_sent,
                temporary_password,
            },
        )),
    ))
}

/// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("role" = Option<String>, Query, description = "Filter by role"),
        ("isActive" = Option<String>, Query, description = "true or false"),
        ("search" = Option<String>, Query, description = "Name, email or phone"),
        ("page" = Option<String>, Query, description = "Page number, default 1"),
        ("limit" = Option<String>, Query, description = "Page size, default 50; 0 or all for everything")
    ),
    responses(
        (status = 200, description = "Paginated users", body = ApiResponse<UserPage>),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Query(params): Query<UserListParams>,
) -> Result<Json<ApiResponse<UserPage>>, AppError> {
    let page = PageRequest::parse(params.page.as_deref(), params.limit.as_deref(), DEFAULT_PAGE_SIZE);
    let is_active = match params.is_active.as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    };

    let (rows, total) = repo::user::list(
        &pool,
        trimmed(&params.role),
        is_active,
        params.search.as_deref(),
        page.limit,
        page.offset(),
    )
    .await?;

    let pagination = page.pagination(total, rows.len());
    Ok(Json(ApiResponse::ok(UserPage {
        users: rows.into_iter().map(UserResponse::from).collect(),
        pagination,
    })))
}

/// GET /api/users/{id}
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserResponse>),
        (status = 403, description = "Not your account", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let id = parse_id(&id)?;
    ensure_self_or_admin(&caller, id)?;

    let user = repo::user::get(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(ApiResponse::ok(UserResponse::from(user))))
}

/// PUT /api/users/{id}
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User UUID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 403, description = "Not your account", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn update_user(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(mut body): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let id = parse_id(&id)?;
    ensure_self_or_admin(&caller, id)?;
    body.validate_request()?;

    if !caller.is_super_admin() {
        body.role = None;
        body.is_active = None;
        body.assigned_emirates = None;
        body.specializations = None;
        body.permissions = None;
    }
    if let Some(role) = body.role.as_deref() {
        if Role::parse(role).is_none() {
            return Err(AppError::bad_request("Invalid role"));
        }
    }

    let password_hash = match body.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => {
            ensure_min_length(password)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let user = repo::user::update(&pool, id, &body, password_hash)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(ApiResponse::with_message(
        "User updated successfully",
        UserResponse::from(user),
    )))
}

/// DELETE /api/users/{id}
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = String, Path, description = "User UUID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Cannot delete yourself", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool, caller))]
pub async fn delete_user(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    if id == caller.id() {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }

    if !repo::user::delete(&pool, id).await? {
        return Err(AppError::not_found("User not found"));
    }
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

/// POST /api/users/{id}/reset-password
#[utoipa::path(
    post,
    path = "/api/users/{id}/reset-password",
    params(("id" = String, Path, description = "User UUID")),
    request_body = AdminResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = ApiResponse<NewPassword>),
        (status = 400, description = "Missing or short password", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn admin_reset_password(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<AdminResetPasswordRequest>,
) -> Result<Json<ApiResponse<NewPassword>>, AppError> {
    let id = parse_id(&id)?;
    let new_password = body
        .new_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::bad_request("New password is required"))?;
    ensure_min_length(&new_password)?;

    if !repo::user::update_password(&pool, id, &hash_password(&new_password)?).await? {
        return Err(AppError::not_found("User not found"));
    }

    Ok(Json(ApiResponse::with_message(
        "Password reset successfully",
        NewPassword {
            new_password,
            email_sent: None,
        },
    )))
}

/// PUT /api/users/{id}/emirates
#[utoipa::path(
    put,
    path = "/api/users/{id}/emirates",
    params(("id" = String, Path, description = "User UUID")),
    request_body = AssignEmiratesRequest,
    responses(
        (status = 200, description = "Emirates assigned", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid emirates or target role", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool, _caller, body))]
pub async fn assign_emirates(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
    Path(id): Path<String>,
    Json(body): Json<AssignEmiratesRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, AppError> {
    let id = parse_id(&id)?;
    let Value::Array(items) = body.emirates else {
        return Err(AppError::bad_request("Emirates must be an array"));
    };
    let emirates: Vec<String> = items
        .iter()
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
        .collect();

    let target = repo::user::get(&pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if !target.role().is_some_and(|r| r.is_emirate_scoped()) {
        return Err(AppError::bad_request(
            "Only coordinators and counsellors can have assigned emirates",
        ));
    }

    let invalid: Vec<&str> = emirates
        .iter()
        .map(String::as_str)
        .filter(|e| !is_valid_emirate(e))
        .collect();
    if !invalid.is_empty() {
        return Err(AppError::bad_request(format!(
            "Invalid emirates: {}",
            invalid.join(", ")
        )));
    }

    let user = repo::user::set_assigned_emirates(&pool, id, &emirates)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(ApiResponse::with_message(
        "Emirates assigned successfully",
        UserResponse::from(user),
    )))
}

/// POST /api/users/change-password
#[utoipa::path(
    post,
    path = "/api/users/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Missing, short or wrong password", body = ErrorResponse)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn change_password(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(current), Some(new_password)) = (
        body.current_password.as_deref().filter(|p| !p.is_empty()),
        body.new_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request(
            "Current password and new password are required",
        ));
    };
    ensure_min_length(new_password)?;

    if !verify_password(current, &caller.user.password_hash) {
        return Err(AppError::bad_request("Current password is incorrect"));
    }

    repo::user::update_password(&pool, caller.id(), &hash_password(new_password)?).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

// ── Bulk client import ──────────────────────────────────────────────

fn row_text<'a>(row: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Detail fields of an import row. Non-string values are ignored.
fn row_profile(row: &serde_json::Map<String, Value>) -> ClientProfile {
    let text = |key: &str| row_text(row, key).map(str::to_string);
    ClientProfile {
        nationality: text("nationality"),
        emirates_id: text("emiratesId"),
        whatsapp_number: text("whatsappNumber"),
        landline_number: text("landlineNumber"),
        company_name: text("companyName"),
        company_address: text("companyAddress"),
        company_email: text("companyEmail"),
        company_phone: text("companyPhone"),
        occupation: text("occupation"),
        employer_name: text("employerName"),
        address: text("address"),
        city: text("city"),
        notes: text("notes"),
    }
}

enum ImportOutcome {
    Created,
    Updated,
}

async fn import_client_row(
    pool: &Pool<Postgres>,
    row: &serde_json::Map<String, Value>,
    line: usize,
    created_by: Uuid,
) -> Result<ImportOutcome, String> {
    let (Some(name), Some(email), Some(phone)) = (
        row_text(row, "name"),
        row_text(row, "email"),
        row_text(row, "phone"),
    ) else {
        return Err(format!("Row {line}: Missing required fields"));
    };
    let profile = row_profile(row);

    let existing = repo::user::find_by_email_or_phone(pool, email, phone)
        .await
        .map_err(|e| format!("Row {line}: {}", e.message))?;
    if let Some(user) = existing {
        repo::user::update_profile_details(pool, user.id, &profile)
            .await
            .map_err(|e| format!("Row {line}: {}", e.message))?;
        return Ok(ImportOutcome::Updated);
    }

    let client_number = match row_text(row, "clientNumber") {
        Some(number) => {
            let taken = repo::user::client_number_exists(pool, number)
                .await
                .map_err(|e| format!("Row {line}: {}", e.message))?;
            if taken {
                return Err(format!("Row {line}: Client number {number} already exists"));
            }
            number.to_string()
        }
        None => repo::user::generate_client_number(pool)
            .await
            .map_err(|e| format!("Row {line}: {}", e.message))?,
    };

    let password = helpers::generate_random_password();
    let hash = hash_password(&password).map_err(|e| format!("Row {line}: {}", e.message))?;
    let mut new = NewUser::new(email, hash, name, phone, Role::Client.as_str());
    new.client_number = Some(client_number.clone());
    new.is_active = import_flag_is_active(row.get("isActive"));
    new.created_by = Some(created_by);
    new.profile = profile;

    let user = repo::user::create(pool, new)
        .await
        .map_err(|e| format!("Row {line}: {}", e.message))?;

    let (subject, html) = mailgun::templates::imported_client_credentials(
        &user.name,
        &user.email,
        &password,
        &client_number,
    );
    if !mailgun::try_send(&user.email, &subject, &html).await {
        tracing::warn!(user_id = %user.id, "Imported client credentials not emailed");
    }
    Ok(ImportOutcome::Created)
}

/// POST /api/users/import
#[utoipa::path(
    post,
    path = "/api/users/import",
    request_body = Vec<serde_json::Value>,
    responses(
        (status = 200, description = "Import finished", body = ApiResponse<ClientImportResults>),
        (status = 400, description = "Not an array or empty", body = ErrorResponse)
    ),
    tag = "users"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn import_clients(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Json(body): Json<Value>,
) -> Result<Json<ApiResponse<ClientImportResults>>, AppError> {
    let Value::Array(rows) = body else {
        return Err(AppError::bad_request(
            "Invalid data format. Expected an array of clients.",
        ));
    };
    if rows.is_empty() {
        return Err(AppError::bad_request("No data provided. The array is empty."));
    }

    let mut results = ClientImportResults::default();
    let mut errors = Vec::new();
    let empty = serde_json::Map::new();
    for (index, row) in rows.iter().enumerate() {
        let row = row.as_object().unwrap_or(&empty);
        match import_client_row(&pool, row, index + 2, caller.id()).await {
            Ok(ImportOutcome::Created) => results.created += 1,
            Ok(ImportOutcome::Updated) => results.updated += 1,
            Err(e) => {
                results.failed += 1;
                errors.push(e);
            }
        }
    }

    tracing::info!(
        created = results.created,
        updated = results.updated,
        failed = results.failed,
        "Client import finished"
    );
    results.total_errors = errors.len() as i64;
    errors.truncate(MAX_REPORTED_IMPORT_ERRORS);
    results.errors = errors;

    Ok(Json(ApiResponse::with_message(
        format!(
            "Import completed: {} created, {} updated, {} failed",
            results.created, results.updated, results.failed
        ),
        results,
    )))
}
