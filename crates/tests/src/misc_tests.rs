use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{self, Part};

#[tokio::test]
async fn health_reports_database_status() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["status"], "ok");
    assert_eq!(resp["db"], "ok");
    assert_eq!(resp["storage"], "local");
}

#[tokio::test]
async fn unknown_route_is_a_json_404() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::get_authed(&app.router, "/api/nope", &app.admin.token).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["success"], false);
    assert_eq!(resp["message"], "Route GET /api/nope not found");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let (app, _guard) = common::test_app().await;

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = common::send_raw(&app.router, req).await;
    assert!(headers.contains_key("x-request-id"));

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = common::send_raw(&app.router, req).await;
    assert_eq!(headers["x-request-id"], "abc-123");
}

#[tokio::test]
async fn admin_creates_staff_and_clients() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/users",
        &json!({
            "email": "New.Lawyer@test.ae",
            "name": "New Lawyer",
            "phone": "+971501010101",
            "role": "lawyer",
            "password": "Counsel123",
        }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["data"]["user"]["email"], "new.lawyer@test.ae");
    assert!(resp["data"].get("temporaryPassword").is_none());

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/users",
        &json!({
            "email": "walkin@test.ae",
            "name": "Walk In",
            "phone": "+971502020202",
            "role": "client",
        }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert!(resp["data"]["temporaryPassword"].as_str().is_some());
    assert!(resp["data"]["user"]["clientNumber"].as_str().is_some());

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/users",
        &json!({
            "email": "walkin@test.ae",
            "name": "Walk In Again",
            "phone": "+971503030303",
            "role": "client",
        }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(resp["message"], "User with this email already exists");
}

#[tokio::test]
async fn only_super_admin_manages_users() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/users",
        &json!({ "email": "x@test.ae", "name": "X", "phone": "+971504040404", "role": "client" }),
        &app.lawyer.token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["message"], "Super Admin access required.");

    let (status, _) = common::get_authed(&app.router, "/api/users", &app.coordinator.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn dashboards_are_role_specific() {
    let (app, _guard) = common::test_app().await;
    common::register_test_case(&app, "dash.client@test.ae").await;

    let (status, resp) =
        common::get_authed(&app.router, "/api/dashboard/super-admin", &app.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["totalCases"], 1);
    assert_eq!(resp["data"]["pendingCases"], 1);

    let (status, resp) =
        common::get_authed(&app.router, "/api/dashboard/coordinator", &app.coordinator.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["myCases"], 1);
    assert_eq!(resp["data"]["pendingAssignment"], 1);

    let (status, _) =
        common::get_authed(&app.router, "/api/dashboard/coordinator", &app.lawyer.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn subscription_lifecycle_keeps_original_attribution() {
    let (app, _guard) = common::test_app().await;
    let subscribe = |body: serde_json::Value| {
        let router = app.router.clone();
        async move { common::post_json(&router, "/api/subscriptions/subscribe", &body).await }
    };

    let (status, resp) = subscribe(json!({ "source": "footer" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Email is required");

    let (status, resp) = subscribe(json!({
        "email": "Reader@Example.ae",
        "userId": app.client.id,
        "source": "footer",
    }))
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["message"], "Subscribed");
    assert_eq!(resp["data"]["email"], "reader@example.ae");
    let id = resp["data"]["id"].as_i64().unwrap();

    let (status, resp) = subscribe(json!({ "email": "reader@example.ae" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["message"], "Already subscribed");

    let (status, resp) = common::post_json(
        &app.router,
        "/api/subscriptions/unsubscribe",
        &json!({ "id": id }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["status"], "unsubscribed");

    let (status, resp) = subscribe(json!({
        "email": "reader@example.ae",
        "userId": app.lawyer.id,
        "source": "blog",
    }))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["message"], "Resubscribed");
    assert_eq!(resp["data"]["status"], "subscribed");
    assert_eq!(resp["data"]["userId"], app.client.id.to_string());
    assert_eq!(resp["data"]["source"], "footer");

    let (status, resp) =
        common::post_json(&app.router, "/api/subscriptions/unsubscribe", &json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Provide id or email to unsubscribe");

    let (status, resp) = common::post_json(
        &app.router,
        "/api/subscriptions/unsubscribe",
        &json!({ "email": "nobody@example.ae" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["message"], "Subscription not found");

    let (status, _) =
        common::get_authed(&app.router, "/api/subscriptions", &app.coordinator.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, resp) = common::get_authed(&app.router, "/api/subscriptions", &app.admin.token).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn settings_upsert_keeps_metadata_and_records_editor() {
    let (app, _guard) = common::test_app().await;
    let uri = "/api/settings/office_hours";

    let (status, resp) = common::get_authed(&app.router, uri, &app.admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["message"], "Setting not found");

    let (status, resp) =
        common::put_json_authed(&app.router, uri, &json!({ "category": "general" }), &app.admin.token)
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Value is required");

    let first = json!({
        "value": { "open": "08:00", "close": "17:00" },
        "category": "general",
        "description": "Front desk hours",
    });
    let (status, resp) = common::put_json_authed(&app.router, uri, &first, &app.admin.token).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["message"], "Setting saved");
    assert_eq!(resp["data"]["key"], "office_hours");

    let (status, resp) = common::put_json_authed(
        &app.router,
        uri,
        &json!({ "value": { "open": "09:00", "close": "18:00" } }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["value"]["open"], "09:00");
    assert_eq!(resp["data"]["category"], "general");
    assert_eq!(resp["data"]["description"], "Front desk hours");
    assert_eq!(resp["data"]["updatedBy"], app.admin.id.to_string());

    let (_, resp) = common::get_authed(&app.router, "/api/settings", &app.admin.token).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);

    let (status, _) = common::put_json_authed(&app.router, uri, &first, &app.coordinator.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn document_upload_checks_type_and_size() {
    let (app, _guard) = common::test_app().await;
    let data = common::register_test_case(&app, "docs.client@test.ae").await;
    let case_id = data["case"]["id"].as_str().unwrap().to_string();

    let upload = |content_type: &'static str, bytes: Vec<u8>| {
        let router = app.router.clone();
        let token = app.coordinator.token.clone();
        let case_id = case_id.clone();
        async move {
            let parts = [
                Part::Text("caseId", &case_id),
                Part::Text("category", "contract"),
                Part::File {
                    field: "file",
                    file_name: "evidence.bin",
                    content_type,
                    bytes: &bytes,
                },
            ];
            common::post_multipart(&router, "/api/documents/upload", &parts, Some(&token)).await
        }
    };

    let (status, resp) = upload("text/plain", b"plain text".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap().starts_with("Invalid file type."));

    let oversized = vec![0u8; 10 * 1024 * 1024 + 1];
    let (status, resp) = upload("application/pdf", oversized).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "File too large. Maximum size is 10MB.");

    let (_, resp) = common::get_authed(
        &app.router,
        &format!("/api/documents/case/{case_id}"),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 0);

    let (status, resp) = upload("application/pdf", b"%PDF-1.4 test".to_vec()).await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["data"]["fileType"], "application/pdf");
    assert_eq!(resp["data"]["fileSize"], 13);
    assert_eq!(resp["data"]["category"], "contract");

    let (_, resp) = common::get_authed(
        &app.router,
        &format!("/api/documents/case/{case_id}"),
        &app.coordinator.token,
    )
    .await;
    let documents = resp["data"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["originalFileName"], "evidence.bin");
}
