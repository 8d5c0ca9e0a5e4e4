use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use shared_types::{
    ApiResponse, AppError, AuthSession, EmailRequest, ErrorResponse, LoginOutcome, LoginRequest,
    MessageResponse, NewPassword, OtpRequest, OtpSessionCreated, OtpVerifyRequest,
    PasswordReset, PendingResetView, RefreshRequest, RefreshedToken, RegisterRequest,
    RegisteredUser, RejectResetRequest, ResetPasswordRequest, Role, TwoFactorConfirmRequest,
    TwoFactorLoginRequest, TwoFactorSetup, User, UserResponse,
};

use crate::auth::jwt::{self, TOKEN_TYPE_2FA_PENDING, TOKEN_TYPE_RESET};
use crate::auth::password::{ensure_min_length, hash_password, verify_password};
use crate::auth::{totp, AuthUser, ClientIp, SuperAdmin};
use crate::error_convert::{SqlxErrorExt, ValidateRequest};
use crate::repo::user::NewUser;
use crate::{config, helpers, mailgun, repo, twilio};

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn issue_session(user: User) -> Result<AuthSession, AppError> {
    let token = jwt::create_access_token(user.id, &user.role)?;
    let refresh_token = jwt::create_refresh_token(user.id, &user.role)?;
    Ok(AuthSession {
        user: UserResponse::from(user),
        token,
        refresh_token,
    })
}

fn ensure_not_locked(user: &User) -> Result<(), AppError> {
    match user.two_factor_lock_until {
        Some(until) if until > Utc::now() => Err(AppError::locked(
            "Too many failed attempts. Try again later.",
        )),
        _ => Ok(()),
    }
}

// ── Password login and 2FA ──────────────────────────────────────────

/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, or second factor required", body = ApiResponse<LoginOutcome>),
        (status = 400, description = "Missing credentials", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 423, description = "Locked after failed 2FA attempts", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body, ip))]
pub async fn login(
    State(pool): State<Pool<Postgres>>,
    ClientIp(ip): ClientIp,
    Json(body): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginOutcome>>, AppError> {
    let (Some(email), Some(password)) = (required(&body.email), body.password.as_deref()) else {
        return Err(AppError::bad_request("Email and password are required"));
    };
    if password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let user = repo::user::find_by_email(&pool, email)
        .await?
        .filter(|u| verify_password(password, &u.password_hash))
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !user.is_active {
        return Err(AppError::unauthorized("Your account has been deactivated"));
    }
    ensure_not_locked(&user)?;

    if user.two_factor_enabled {
        let pending = jwt::create_pending_2fa_token(user.id, &user.role)?;
        return Ok(Json(ApiResponse::with_message(
            "Two-factor authentication required",
            LoginOutcome::TwoFactorRequired {
                two_factor_required: true,
                pending_two_factor_token: pending,
            },
        )));
    }

    let user = repo::user::record_login(&pool, user.id, ip.as_deref()).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(ApiResponse::with_message(
        "Login successful",
        LoginOutcome::Session(issue_session(user)?),
    )))
}

/// POST /api/auth/2fa/setup
#[utoipa::path(
    post,
    path = "/api/auth/2fa/setup",
    responses(
        (status = 200, description = "Secret generated", body = ApiResponse<TwoFactorSetup>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, caller))]
pub async fn two_factor_setup(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ApiResponse<TwoFactorSetup>>, AppError> {
    let secret = totp::generate_secret();
    repo::user::begin_two_factor_setup(&pool, caller.id(), &secret).await?;

    let otpauth_url =
        totp::otpauth_url(&config::two_factor_app_name(), &caller.user.email, &secret);
    Ok(Json(ApiResponse::ok(TwoFactorSetup {
        manual_entry_key: secret,
        otpauth_url,
    })))
}

/// POST /api/auth/2fa/confirm
#[utoipa::path(
    post,
    path = "/api/auth/2fa/confirm",
    request_body = TwoFactorConfirmRequest,
    responses(
        (status = 200, description = "2FA enabled", body = MessageResponse),
        (status = 400, description = "Missing or invalid code", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn two_factor_confirm(
    State(pool): State<Pool<Postgres>>,
    AuthUser(caller): AuthUser,
    Json(body): Json<TwoFactorConfirmRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let otp = required(&body.otp).ok_or_else(|| AppError::bad_request("OTP is required"))?;

    let user = repo::user::get(&pool, caller.id())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let secret = user
        .two_factor_secret
        .as_deref()
        .ok_or_else(|| AppError::bad_request("2FA setup not initiated"))?;

    if !totp::verify(secret, otp) {
        return Err(AppError::bad_request("Invalid OTP"));
    }

    repo::user::confirm_two_factor(&pool, user.id).await?;
    Ok(Json(MessageResponse::new("Two-factor authentication enabled")))
}

/// POST /api/auth/2fa/verify-login
#[utoipa::path(
    post,
    path = "/api/auth/2fa/verify-login",
    request_body = TwoFactorLoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthSession>),
        (status = 400, description = "Invalid session or code", body = ErrorResponse),
        (status = 423, description = "Locked", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body, ip))]
pub async fn two_factor_verify_login(
    State(pool): State<Pool<Postgres>>,
    ClientIp(ip): ClientIp,
    Json(body): Json<TwoFactorLoginRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, AppError> {
    let (Some(token), Some(otp)) = (required(&body.pending_two_factor_token), required(&body.otp))
    else {
        return Err(AppError::bad_request("Pending token and OTP are required"));
    };

    let claims = jwt::validate_token(token, TOKEN_TYPE_2FA_PENDING)
        .map_err(|_| AppError::bad_request("Invalid 2FA session"))?;

    let user = repo::user::get(&pool, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::unauthorized("User not found or inactive"))?;
    ensure_not_locked(&user)?;

    let valid = user
        .two_factor_secret
        .as_deref()
        .is_some_and(|secret| totp::verify(secret, otp));
    if !valid {
        if repo::user::record_two_factor_failure(&pool, user.id).await? {
            tracing::warn!(user_id = %user.id, "2FA locked after repeated failures");
        }
        return Err(AppError::bad_request("Invalid OTP"));
    }

    repo::user::reset_two_factor_failures(&pool, user.id).await?;
    let user = repo::user::record_login(&pool, user.id, ip.as_deref()).await?;
    Ok(Json(ApiResponse::with_message(
        "Login successful",
        issue_session(user)?,
    )))
}

// ── Registration and phone OTP ──────────────────────────────────────

/// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Client account created", body = ApiResponse<RegisteredUser>),
        (status = 400, description = "Missing or invalid fields", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn register(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RegisteredUser>>), AppError> {
    let (Some(email), Some(password), Some(name), Some(phone)) = (
        required(&body.email),
        body.password.as_deref().filter(|p| !p.is_empty()),
        body.display_name(),
        required(&body.phone),
    ) else {
        return Err(AppError::bad_request(
            "Email, password, full name, and phone are required",
        ));
    };
    body.validate_request()?;
    ensure_min_length(password)?;

    if repo::user::find_by_email(&pool, email).await?.is_some() {
        return Err(AppError::conflict("User already exists"));
    }

    if let Some(requested) = required(&body.role).filter(|r| *r != Role::Client.as_str()) {
        tracing::warn!(requested, "Ignoring non-client role on self-registration");
    }

    let new = NewUser::new(email, hash_password(password)?, name, phone, Role::Client.as_str());
    let user = repo::user::create(&pool, new).await?;
    tracing::info!(user_id = %user.id, "Client self-registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "User registered successfully",
            RegisteredUser {
                user: UserResponse::from(user),
            },
        )),
    ))
}

/// POST /api/auth/otp/request
#[utoipa::path(
    post,
    path = "/api/auth/otp/request",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "OTP sent", body = ApiResponse<OtpSessionCreated>),
        (status = 404, description = "No user with that phone", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn request_otp(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<OtpRequest>,
) -> Result<Json<ApiResponse<OtpSessionCreated>>, AppError> {
    let phone =
        required(&body.phone).ok_or_else(|| AppError::bad_request("Phone number is required"))?;

    let user = repo::user::find_by_phone(&pool, phone)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if !user.is_active {
        return Err(AppError::unauthorized("Your account has been deactivated"));
    }

    let otp = helpers::generate_otp();
    let session =
        repo::auth::create_otp_session(&pool, user.id, &user.phone, &helpers::sha256_hex(&otp))
            .await?;

    if let Err(e) = twilio::send_otp(&helpers::format_phone_number(&user.phone), &otp).await {
        tracing::error!(error = %e, user_id = %user.id, "Failed to send OTP SMS");
    }

    Ok(Json(ApiResponse::with_message(
        "OTP sent successfully",
        OtpSessionCreated {
            session_id: session.session_id,
            expires_in: repo::auth::OTP_TTL_SECONDS,
        },
    )))
}

/// POST /api/auth/otp/verify
#[utoipa::path(
    post,
    path = "/api/auth/otp/verify",
    request_body = OtpVerifyRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<AuthSession>),
        (status = 400, description = "Invalid, expired or mismatched OTP", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn verify_otp(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<OtpVerifyRequest>,
) -> Result<Json<ApiResponse<AuthSession>>, AppError> {
    let (Some(session_id), Some(otp)) = (required(&body.session_id), required(&body.otp)) else {
        return Err(AppError::bad_request("Session ID and OTP are required"));
    };

    let session = match Uuid::parse_str(session_id) {
        Ok(id) => repo::auth::find_otp_session(&pool, id).await?,
        Err(_) => None,
    }
    .ok_or_else(|| AppError::bad_request("Invalid or expired session"))?;

    if session.is_expired() {
        repo::auth::delete_otp_session(&pool, session.session_id).await?;
        return Err(AppError::bad_request("OTP has expired"));
    }
    if session.otp_hash != helpers::sha256_hex(otp) {
        return Err(AppError::bad_request("Invalid OTP"));
    }

    repo::auth::delete_otp_session(&pool, session.session_id).await?;
    let user = repo::user::record_phone_login(&pool, session.user_id).await?;
    Ok(Json(ApiResponse::with_message(
        "Login successful",
        issue_session(user)?,
    )))
}

// ── Tokens and password recovery ────────────────────────────────────

/// POST /api/auth/refresh
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = ApiResponse<RefreshedToken>),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<RefreshedToken>>, AppError> {
    let token = required(&body.refresh_token)
        .ok_or_else(|| AppError::bad_request("Refresh token is required"))?;
    let rejected = || AppError::unauthorized("Invalid or expired refresh token");

    let claims = jwt::validate_refresh_token(token).map_err(|_| rejected())?;
    let user = repo::user::get(&pool, claims.sub)
        .await
        .map_err(|_| rejected())?
        .filter(|u| u.is_active)
        .ok_or_else(rejected)?;

    let token = jwt::create_access_token(user.id, &user.role)?;
    Ok(Json(ApiResponse::ok(RefreshedToken { token })))
}

/// POST /api/auth/forgot-password
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Reset link sent if the account exists", body = MessageResponse),
        (status = 400, description = "Missing email", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn forgot_password(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = required(&body.email).ok_or_else(|| AppError::bad_request("Email is required"))?;

    if let Some(user) = repo::user::find_by_email(&pool, email).await? {
        let token = jwt::create_reset_token(user.id, &user.role)?;
        let (subject, html) = mailgun::templates::password_reset_link(&user.name, &token);
        if !mailgun::try_send(&user.email, &subject, &html).await {
            tracing::warn!(user_id = %user.id, "Password reset email not sent");
        }
    }

    Ok(Json(MessageResponse::new(
        "If the email exists, a reset link has been sent",
    )))
}

/// POST /api/auth/reset-password
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid token or password", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn reset_password(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let (Some(token), Some(new_password)) = (
        required(&body.token),
        body.new_password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request("Token and new password are required"));
    };
    ensure_min_length(new_password)?;

    let claims = jwt::validate_token(token, TOKEN_TYPE_RESET)
        .map_err(|_| AppError::bad_request("Invalid or expired reset token"))?;

    let hash = hash_password(new_password)?;
    if !repo::user::update_password(&pool, claims.sub, &hash).await? {
        return Err(AppError::not_found("User not found"));
    }

    Ok(Json(MessageResponse::new("Password has been reset successfully")))
}

/// POST /api/auth/logout
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse)
    ),
    tag = "auth"
)]
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse::new("Logged out successfully"))
}

// ── Admin-approved resets ───────────────────────────────────────────

/// POST /api/auth/request-reset
#[utoipa::path(
    post,
    path = "/api/auth/request-reset",
    request_body = EmailRequest,
    responses(
        (status = 201, description = "Reset request filed", body = ApiResponse<PasswordReset>),
        (status = 400, description = "Missing email or request already pending", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, body))]
pub async fn request_reset(
    State(pool): State<Pool<Postgres>>,
    Json(body): Json<EmailRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PasswordReset>>), AppError> {
    let email = required(&body.email).ok_or_else(|| AppError::bad_request("Email is required"))?;

    let user = repo::user::find_by_email(&pool, email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if repo::auth::has_open_reset_request(&pool, user.id).await? {
        return Err(AppError::bad_request("A pending request already exists"));
    }

    let request = repo::auth::create_reset_request(&pool, user.id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Password reset request submitted. An administrator will review it.",
            request,
        )),
    ))
}

/// GET /api/auth/pending-resets
#[utoipa::path(
    get,
    path = "/api/auth/pending-resets",
    responses(
        (status = 200, description = "Pending reset requests", body = ApiResponse<Vec<PendingResetView>>),
        (status = 403, description = "Super admin only", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn pending_resets(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(_caller): SuperAdmin,
) -> Result<Json<ApiResponse<Vec<PendingResetView>>>, AppError> {
    let requests = repo::auth::pending_reset_requests(&pool).await?;
    let ids: Vec<Uuid> = requests.iter().map(|r| r.user_id).collect();
    let users = repo::user::summaries_by_ids(&pool, &ids).await?;

    let views = requests
        .into_iter()
        .map(|request| PendingResetView {
            user: repo::user::pick(&users, Some(request.user_id)).map(|mut u| {
                u.phone = None;
                u
            }),
            request,
        })
        .collect();
    Ok(Json(ApiResponse::ok(views)))
}

async fn load_pending_request(pool: &Pool<Postgres>, id: &str) -> Result<PasswordReset, AppError> {
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("Invalid UUID format"))?;
    let request = repo::auth::find_reset_request(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Reset request not found"))?;
    if request.status != "pending" {
        return Err(AppError::bad_request("Request already processed"));
    }
    Ok(request)
}

/// PUT /api/auth/pending-resets/{id}/approve
#[utoipa::path(
    put,
    path = "/api/auth/pending-resets/{id}/approve",
    params(("id" = String, Path, description = "Reset request UUID")),
    responses(
        (status = 200, description = "Approved; new password issued", body = ApiResponse<NewPassword>),
        (status = 400, description = "Already processed", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, caller))]
pub async fn approve_reset(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NewPassword>>, AppError> {
    let request = load_pending_request(&pool, &id).await?;
    let user = repo::user::get(&pool, request.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let new_password = helpers::generate_random_password();
    let password_hash = hash_password(&new_password)?;

    // Claim the request first; a concurrent approval loses here and never
    // touches the password.
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;
    repo::auth::resolve_reset_request(&mut *tx, request.id, "approved", caller.id(), None)
        .await?
        .ok_or_else(|| AppError::bad_request("Request already processed"))?;
    repo::user::update_password(&mut *tx, user.id, &password_hash).await?;
    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;

    let (subject, html) =
        mailgun::templates::approved_new_password(&user.name, &user.email, &new_password);
    let email_sent = mailgun::try_send(&user.email, &subject, &html).await;

    Ok(Json(ApiResponse::with_message(
        "Password reset approved",
        NewPassword {
            new_password,
            email_sent: Some(email_sent),
        },
    )))
}

/// PUT /api/auth/pending-resets/{id}/reject
#[utoipa::path(
    put,
    path = "/api/auth/pending-resets/{id}/reject",
    params(("id" = String, Path, description = "Reset request UUID")),
    request_body = RejectResetRequest,
    responses(
        (status = 200, description = "Rejected", body = ApiResponse<PasswordReset>),
        (status = 400, description = "Already processed", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(pool, caller, body))]
pub async fn reject_reset(
    State(pool): State<Pool<Postgres>>,
    SuperAdmin(caller): SuperAdmin,
    Path(id): Path<String>,
    body: Option<Json<RejectResetRequest>>,
) -> Result<Json<ApiResponse<PasswordReset>>, AppError> {
    let request = load_pending_request(&pool, &id).await?;
    let reason = body.and_then(|Json(b)| b.reason);

    let updated = repo::auth::resolve_reset_request(
        &pool,
        request.id,
        "rejected",
        caller.id(),
        reason.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::bad_request("Request already processed"))?;

    Ok(Json(ApiResponse::with_message("Password reset request rejected", updated)))
}
