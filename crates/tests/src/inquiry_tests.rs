use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{self, Part};

fn complete_form<'a>() -> Vec<Part<'a>> {
    vec![
        Part::Text("firstName", "Mariam"),
        Part::Text("lastName", "Saeed"),
        Part::Text("email", "mariam@example.ae"),
        Part::Text("phone", "+971501234567"),
        Part::Text("caseType", "Labour"),
        Part::Text("title", "Unpaid salary"),
        Part::Text("description", "Three months of salary are outstanding."),
        Part::Text("preferredDate", "2025-08-15"),
    ]
}

#[tokio::test]
async fn public_submission_needs_no_token() {
    let (app, _guard) = common::test_app().await;

    let mut parts = complete_form();
    parts.push(Part::File {
        field: "documents",
        file_name: "contract.pdf",
        content_type: "application/pdf",
        bytes: b"%PDF-1.4 test",
    });
    let (status, resp) = common::post_multipart(&app.router, "/api/case-inquiries", &parts, None).await;

    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["message"], "Case inquiry submitted successfully");
    assert_eq!(resp["data"]["status"], "pending");
    assert_eq!(resp["data"]["urgency"], "medium");
    assert_eq!(resp["data"]["preferredDate"], "2025-08-15");
    let documents = resp["data"]["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0]["name"], "contract.pdf");
    assert_eq!(documents[0]["mimetype"], "application/pdf");
}

#[tokio::test]
async fn missing_fields_are_named() {
    let (app, _guard) = common::test_app().await;

    let parts = vec![
        Part::Text("firstName", "Mariam"),
        Part::Text("email", "mariam@example.ae"),
        Part::Text("phone", "+971501234567"),
        Part::Text("title", "Unpaid salary"),
    ];
    let (status, resp) = common::post_multipart(&app.router, "/api/case-inquiries", &parts, None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Missing required fields: lastName, description");
}

#[tokio::test]
async fn staff_manage_inquiries_and_clients_cannot() {
    let (app, _guard) = common::test_app().await;
    let (_, resp) =
        common::post_multipart(&app.router, "/api/case-inquiries", &complete_form(), None).await;
    let id = resp["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = common::get_authed(&app.router, "/api/case-inquiries", &app.client.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) =
        common::get_authed(&app.router, "/api/case-inquiries", &app.coordinator.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);

    let uri = format!("/api/case-inquiries/{id}/status");
    let (status, resp) = common::put_json_authed(
        &app.router,
        &uri,
        &json!({ "status": "archived" }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap().starts_with("Invalid status."));

    let (status, resp) = common::put_json_authed(
        &app.router,
        &uri,
        &json!({ "status": "reviewed", "adminNotes": "Called back" }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["status"], "reviewed");
    assert_eq!(resp["data"]["adminNotes"], "Called back");

    let (status, _) = common::delete_authed(
        &app.router,
        &format!("/api/case-inquiries/{id}"),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = common::delete_authed(
        &app.router,
        &format!("/api/case-inquiries/{id}"),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = common::delete_authed(
        &app.router,
        &format!("/api/case-inquiries/{id}"),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
