use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{self, TEST_PASSWORD};

#[tokio::test]
async fn login_returns_session_for_valid_credentials() {
    let (app, _guard) = common::test_app().await;

    let body = json!({ "email": "ADMIN@test.ae", "password": TEST_PASSWORD });
    let (status, resp) = common::post_json(&app.router, "/api/auth/login", &body).await;

    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["success"], true);
    assert_eq!(resp["message"], "Login successful");
    assert_eq!(resp["data"]["user"]["role"], "super_admin");
    assert!(resp["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(resp["data"]["refreshToken"].as_str().is_some());
    assert!(resp["data"]["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (app, _guard) = common::test_app().await;

    let body = json!({ "email": "admin@test.ae", "password": "not-the-password" });
    let (status, resp) = common::post_json(&app.router, "/api/auth/login", &body).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["success"], false);
    assert_eq!(resp["message"], "Invalid credentials");
}

#[tokio::test]
async fn login_requires_email_and_password() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) =
        common::post_json(&app.router, "/api/auth/login", &json!({ "email": "a@b.c" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Email and password are required");
}

#[tokio::test]
async fn deactivated_account_cannot_log_in() {
    let (app, _guard) = common::test_app().await;
    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(app.lawyer.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let body = json!({ "email": app.lawyer.email, "password": TEST_PASSWORD });
    let (status, resp) = common::post_json(&app.router, "/api/auth/login", &body).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["message"], "Your account has been deactivated");
}

#[tokio::test]
async fn protected_route_without_token_is_401() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::get(&app.router, "/api/cases").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["message"], "No token provided. Authorization denied.");
}

#[tokio::test]
async fn garbage_token_is_401() {
    let (app, _guard) = common::test_app().await;

    let (status, _) = common::get_authed(&app.router, "/api/cases", "not-a-jwt").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_creates_client_even_when_other_role_requested() {
    let (app, _guard) = common::test_app().await;

    let body = json!({
        "email": "new.client@test.ae",
        "password": "Secret123",
        "fullName": "New Client",
        "phone": "+971509998877",
        "role": "super_admin",
    });
    let (status, resp) = common::post_json(&app.router, "/api/auth/register", &body).await;

    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["data"]["user"]["role"], "client");

    let (status, _) = common::post_json(&app.router, "/api/auth/register", &body).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn refresh_issues_new_access_token() {
    let (app, _guard) = common::test_app().await;

    let login = json!({ "email": app.client.email, "password": TEST_PASSWORD });
    let (_, session) = common::post_json(&app.router, "/api/auth/login", &login).await;
    let refresh = session["data"]["refreshToken"].as_str().unwrap();

    let (status, resp) =
        common::post_json(&app.router, "/api/auth/refresh", &json!({ "refreshToken": refresh }))
            .await;
    assert_eq!(status, StatusCode::OK);
    let token = resp["data"]["token"].as_str().unwrap();

    let (status, _) = common::get_authed(&app.router, "/api/dashboard/client", token).await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not accepted as a refresh token.
    let (status, _) = common::post_json(
        &app.router,
        "/api/auth/refresh",
        &json!({ "refreshToken": app.client.token }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn password_reset_request_is_approved_by_admin() {
    let (app, _guard) = common::test_app().await;

    let body = json!({ "email": app.counsellor.email });
    let (status, resp) = common::post_json(&app.router, "/api/auth/request-reset", &body).await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    let request_id = resp["data"]["id"].as_str().unwrap().to_string();

    let (status, resp) = common::post_json(&app.router, "/api/auth/request-reset", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "A pending request already exists");

    let (status, _) =
        common::get_authed(&app.router, "/api/auth/pending-resets", &app.lawyer.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) =
        common::get_authed(&app.router, "/api/auth/pending-resets", &app.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);

    let uri = format!("/api/auth/pending-resets/{request_id}/approve");
    let (status, resp) = common::put_json_authed(&app.router, &uri, &json!({}), &app.admin.token).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    let new_password = resp["data"]["newPassword"].as_str().unwrap().to_string();

    let login = json!({ "email": app.counsellor.email, "password": new_password });
    let (status, _) = common::post_json(&app.router, "/api/auth/login", &login).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn second_approval_leaves_issued_password_intact() {
    let (app, _guard) = common::test_app().await;

    let body = json!({ "email": app.lawyer.email });
    let (_, resp) = common::post_json(&app.router, "/api/auth/request-reset", &body).await;
    let uri = format!(
        "/api/auth/pending-resets/{}/approve",
        resp["data"]["id"].as_str().unwrap()
    );

    let (status, resp) = common::put_json_authed(&app.router, &uri, &json!({}), &app.admin.token).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    let issued = resp["data"]["newPassword"].as_str().unwrap().to_string();
    let stored_hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
        .bind(app.lawyer.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let (status, resp) = common::put_json_authed(&app.router, &uri, &json!({}), &app.admin.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Request already processed");

    let hash_after: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
        .bind(app.lawyer.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(hash_after, stored_hash);

    let login = json!({ "email": app.lawyer.email, "password": issued });
    let (status, _) = common::post_json(&app.router, "/api/auth/login", &login).await;
    assert_eq!(status, StatusCode::OK);
}

/// Replace the random code of a stored OTP session with a known one.
async fn pin_otp(app: &common::TestApp, session_id: &str, otp: &str) {
    sqlx::query("UPDATE otp_sessions SET otp_hash = $2 WHERE session_id = $1::uuid")
        .bind(session_id)
        .bind(server::helpers::sha256_hex(otp))
        .execute(&app.pool)
        .await
        .unwrap();
}

async fn otp_session_count(app: &common::TestApp) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM otp_sessions")
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn phone_otp_login_is_single_use() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) =
        common::post_json(&app.router, "/api/auth/otp/request", &json!({ "phone": "+971509999999" }))
            .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["message"], "User not found");

    let (status, resp) =
        common::post_json(&app.router, "/api/auth/otp/request", &json!({ "phone": "+971500000004" }))
            .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["expiresIn"], 600);
    let session_id = resp["data"]["sessionId"].as_str().unwrap().to_string();
    pin_otp(&app, &session_id, "424242").await;

    let wrong = json!({ "sessionId": session_id, "otp": "111111" });
    let (status, resp) = common::post_json(&app.router, "/api/auth/otp/verify", &wrong).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Invalid OTP");
    assert_eq!(otp_session_count(&app).await, 1);

    let right = json!({ "sessionId": session_id, "otp": "424242" });
    let (status, resp) = common::post_json(&app.router, "/api/auth/otp/verify", &right).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["user"]["id"], app.lawyer.id.to_string());
    assert!(resp["data"]["token"].as_str().is_some());
    assert_eq!(otp_session_count(&app).await, 0);

    let (status, resp) = common::post_json(&app.router, "/api/auth/otp/verify", &right).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Invalid or expired session");
}

#[tokio::test]
async fn expired_otp_session_is_deleted_on_verify() {
    let (app, _guard) = common::test_app().await;

    let (_, resp) =
        common::post_json(&app.router, "/api/auth/otp/request", &json!({ "phone": "+971500000005" }))
            .await;
    let session_id = resp["data"]["sessionId"].as_str().unwrap().to_string();
    pin_otp(&app, &session_id, "123456").await;
    sqlx::query("UPDATE otp_sessions SET expires_at = NOW() - INTERVAL '1 minute'")
        .execute(&app.pool)
        .await
        .unwrap();

    let body = json!({ "sessionId": session_id, "otp": "123456" });
    let (status, resp) = common::post_json(&app.router, "/api/auth/otp/verify", &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "OTP has expired");
    assert_eq!(otp_session_count(&app).await, 0);
}

fn current_totp(secret: &str) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    server::auth::totp::code_at(secret, now).unwrap()
}

/// A six-digit code that differs from the current one.
fn wrong_totp(secret: &str) -> String {
    let code: u32 = current_totp(secret).parse().unwrap();
    format!("{:06}", (code + 500_000) % 1_000_000)
}

#[tokio::test]
async fn two_factor_login_locks_after_five_failures() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) =
        common::post_json_authed(&app.router, "/api/auth/2fa/setup", &json!({}), &app.lawyer.token)
            .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    let secret = resp["data"]["manualEntryKey"].as_str().unwrap().to_string();
    assert!(resp["data"]["otpauthUrl"].as_str().unwrap().starts_with("otpauth://totp/"));

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/auth/2fa/confirm",
        &json!({ "otp": current_totp(&secret) }),
        &app.lawyer.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");

    let login = json!({ "email": app.lawyer.email, "password": TEST_PASSWORD });
    let (status, resp) = common::post_json(&app.router, "/api/auth/login", &login).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["twoFactorRequired"], true);
    let pending = resp["data"]["pendingTwoFactorToken"].as_str().unwrap().to_string();

    let attempt = |otp: String| json!({ "pendingTwoFactorToken": pending, "otp": otp });
    for _ in 0..4 {
        let (status, resp) =
            common::post_json(&app.router, "/api/auth/2fa/verify-login", &attempt(wrong_totp(&secret)))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["message"], "Invalid OTP");
    }
    let failures: i32 =
        sqlx::query_scalar("SELECT two_factor_failed_attempts FROM users WHERE id = $1")
            .bind(app.lawyer.id)
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(failures, 4);

    let (status, _) =
        common::post_json(&app.router, "/api/auth/2fa/verify-login", &attempt(wrong_totp(&secret)))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (failures, lock_minutes): (i32, f64) = sqlx::query_as(
        r#"
        SELECT two_factor_failed_attempts,
               EXTRACT(EPOCH FROM (two_factor_lock_until - NOW()))::DOUBLE PRECISION / 60
        FROM users WHERE id = $1
        "#,
    )
    .bind(app.lawyer.id)
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(failures, 0);
    assert!((14.0..=15.0).contains(&lock_minutes), "lock lasts {lock_minutes} minutes");

    let (status, resp) =
        common::post_json(&app.router, "/api/auth/2fa/verify-login", &attempt(current_totp(&secret)))
            .await;
    assert_eq!(status, StatusCode::LOCKED);
    assert_eq!(resp["message"], "Too many failed attempts. Try again later.");

    let (status, _) = common::post_json(&app.router, "/api/auth/login", &login).await;
    assert_eq!(status, StatusCode::LOCKED);

    sqlx::query("UPDATE users SET two_factor_lock_until = NOW() - INTERVAL '1 second' WHERE id = $1")
        .bind(app.lawyer.id)
        .execute(&app.pool)
        .await
        .unwrap();
    let (status, resp) =
        common::post_json(&app.router, "/api/auth/2fa/verify-login", &attempt(current_totp(&secret)))
            .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert!(resp["data"]["token"].as_str().is_some());
}

#[tokio::test]
async fn logout_always_succeeds() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json(&app.router, "/api/auth/logout", &json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["success"], true);
}
