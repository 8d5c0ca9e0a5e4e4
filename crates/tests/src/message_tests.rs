use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use crate::common;

#[tokio::test]
async fn client_message_defaults_to_medium_priority() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/messages",
        &json!({ "subject": "Hearing date", "message": "When is my next hearing?" }),
        &app.client.token,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["data"]["priority"], "medium");
    assert_eq!(resp["data"]["status"], "pending");
    assert_eq!(resp["data"]["clientId"], app.client.id.to_string());
}

#[tokio::test]
async fn invalid_priority_and_missing_fields_are_rejected() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/messages",
        &json!({ "subject": "Hi", "message": "Hello", "priority": "critical" }),
        &app.client.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap().starts_with("Invalid priority."));

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/messages",
        &json!({ "subject": "Hi" }),
        &app.client.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Subject and message are required");
}

#[tokio::test]
async fn reply_flow_tracks_unread_on_both_sides() {
    let (app, _guard) = common::test_app().await;
    let (_, resp) = common::post_json_authed(
        &app.router,
        "/api/messages",
        &json!({ "subject": "Invoice", "message": "Please resend the invoice", "priority": "high" }),
        &app.client.token,
    )
    .await;
    let id = resp["data"]["id"].as_str().unwrap().to_string();

    let (_, resp) =
        common::get_authed(&app.router, "/api/messages/unread-count", &app.admin.token).await;
    assert_eq!(resp["data"]["unreadCount"], 1);

    // Opening it as the admin clears the admin-side flag.
    let (status, _) =
        common::get_authed(&app.router, &format!("/api/messages/{id}"), &app.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    let (_, resp) =
        common::get_authed(&app.router, "/api/messages/unread-count", &app.admin.token).await;
    assert_eq!(resp["data"]["unreadCount"], 0);

    let (status, resp) = common::post_json_authed(
        &app.router,
        &format!("/api/messages/{id}/reply"),
        &json!({ "adminReply": "Sent again to your email." }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["status"], "replied");
    assert_eq!(resp["data"]["repliedBy"], app.admin.id.to_string());

    let (_, resp) =
        common::get_authed(&app.router, "/api/messages/unread-count", &app.client.token).await;
    assert_eq!(resp["data"]["unreadCount"], 1);

    let (_, resp) =
        common::get_authed(&app.router, &format!("/api/messages/{id}"), &app.client.token).await;
    assert_eq!(resp["data"]["adminReply"], "Sent again to your email.");

    let (_, resp) =
        common::get_authed(&app.router, "/api/messages/unread-count", &app.client.token).await;
    assert_eq!(resp["data"]["unreadCount"], 0);
}

#[tokio::test]
async fn reply_requires_super_admin_and_text() {
    let (app, _guard) = common::test_app().await;
    let (_, resp) = common::post_json_authed(
        &app.router,
        "/api/messages",
        &json!({ "subject": "Docs", "message": "Uploaded my passport" }),
        &app.client.token,
    )
    .await;
    let uri = format!("/api/messages/{}/reply", resp["data"]["id"].as_str().unwrap());

    let (status, resp) =
        common::post_json_authed(&app.router, &uri, &json!({ "adminReply": "ok" }), &app.lawyer.token)
            .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["message"], "Super Admin access required.");

    let (status, resp) =
        common::post_json_authed(&app.router, &uri, &json!({ "adminReply": "  " }), &app.admin.token)
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Reply message is required");
}

#[tokio::test]
async fn clients_cannot_read_each_others_messages() {
    let (app, _guard) = common::test_app().await;
    let (_, resp) = common::post_json_authed(
        &app.router,
        "/api/messages",
        &json!({ "subject": "Private", "message": "Only for the office" }),
        &app.client.token,
    )
    .await;
    let id = resp["data"]["id"].as_str().unwrap().to_string();

    let (status, other) = common::post_json(
        &app.router,
        "/api/auth/register",
        &json!({
            "fullName": "Other Client",
            "email": "other.client@test.ae",
            "phone": "+971509998877",
            "password": common::TEST_PASSWORD,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{other}");
    let other_id: Uuid = other["data"]["user"]["id"].as_str().unwrap().parse().unwrap();
    let other_token = server::auth::jwt::create_access_token(other_id, "client").unwrap();

    let (status, resp) =
        common::get_authed(&app.router, &format!("/api/messages/{id}"), &other_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["message"], "Access denied");

    let (_, resp) = common::get_authed(&app.router, "/api/messages", &other_token).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 0);
}
