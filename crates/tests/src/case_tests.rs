use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common;

#[tokio::test]
async fn coordinator_registers_case_and_new_client() {
    let (app, _guard) = common::test_app().await;

    let data = common::register_test_case(&app, "fresh.client@test.ae").await;

    let case_number = data["case"]["caseNumber"].as_str().unwrap();
    assert!(case_number.starts_with("CASE-"), "unexpected number {case_number}");
    assert_eq!(data["case"]["status"], "pending");
    assert_eq!(data["case"]["coordinatorId"], app.coordinator.id.to_string());
    assert_eq!(data["client"]["role"], "client");
    assert!(data["temporaryPassword"].as_str().is_some());

    let (status, resp) = common::get_authed(
        &app.router,
        &format!("/api/cases/{}/tracking", data["case"]["id"].as_str().unwrap()),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let records = resp["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["changeType"], "case_registered");
    assert_eq!(records[0]["changeNumber"], 1);
}

#[tokio::test]
async fn registering_for_existing_client_reuses_account() {
    let (app, _guard) = common::test_app().await;

    let data = common::register_test_case(&app, &app.client.email).await;

    assert_eq!(data["client"]["id"], app.client.id.to_string());
    assert!(data.get("temporaryPassword").is_none());
}

#[tokio::test]
async fn coordinator_cannot_register_outside_assigned_emirate() {
    let (app, _guard) = common::test_app().await;

    let body = json!({
        "clientName": "Someone",
        "clientEmail": "someone@test.ae",
        "clientPhone": "0501234567",
        "emirate": "Sharjah",
    });
    let (status, resp) =
        common::post_json_authed(&app.router, "/api/cases", &body, &app.coordinator.token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["message"], "You do not have access to Sharjah.");
    assert_eq!(resp["yourEmirates"], json!(["Dubai"]));
}

#[tokio::test]
async fn registration_requires_client_contact_fields() {
    let (app, _guard) = common::test_app().await;

    let body = json!({ "clientName": "No Contact", "emirate": "Dubai" });
    let (status, resp) =
        common::post_json_authed(&app.router, "/api/cases", &body, &app.admin.token).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Client name, email, and phone are required");
}

#[tokio::test]
async fn lawyer_cannot_register_cases() {
    let (app, _guard) = common::test_app().await;

    let body = json!({ "clientName": "X", "clientEmail": "x@test.ae", "clientPhone": "0501", "emirate": "Dubai" });
    let (status, _) =
        common::post_json_authed(&app.router, "/api/cases", &body, &app.lawyer.token).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn case_list_is_scoped_by_role() {
    let (app, _guard) = common::test_app().await;
    common::register_test_case(&app, &app.client.email).await;
    common::register_test_case(&app, "other.client@test.ae").await;

    let (status, resp) = common::get_authed(&app.router, "/api/cases", &app.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["pagination"]["total"], 2);

    let (_, resp) = common::get_authed(&app.router, "/api/cases", &app.client.token).await;
    assert_eq!(resp["data"]["pagination"]["total"], 1);
    assert_eq!(resp["data"]["cases"][0]["clientId"], app.client.id.to_string());

    // No case has a lawyer yet.
    let (_, resp) = common::get_authed(&app.router, "/api/cases", &app.lawyer.token).await;
    assert_eq!(resp["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn assigning_lawyer_records_tracking_and_scopes_lawyer_list() {
    let (app, _guard) = common::test_app().await;
    let data = common::register_test_case(&app, "assign.client@test.ae").await;
    let case_id = data["case"]["id"].as_str().unwrap();

    let uri = format!("/api/cases/{case_id}/assign-lawyer");
    let (status, resp) = common::put_json_authed(
        &app.router,
        &uri,
        &json!({ "lawyerId": app.client.id }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Invalid lawyer ID. Found: client");

    let (status, resp) = common::put_json_authed(
        &app.router,
        &uri,
        &json!({ "lawyerId": app.lawyer.id }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["lawyerId"], app.lawyer.id.to_string());

    let (_, resp) = common::get_authed(&app.router, "/api/cases", &app.lawyer.token).await;
    assert_eq!(resp["data"]["pagination"]["total"], 1);

    let (_, resp) = common::get_authed(
        &app.router,
        &format!("/api/cases/{case_id}/tracking"),
        &app.admin.token,
    )
    .await;
    let records = resp["data"].as_array().unwrap();
    assert_eq!(records[0]["changeType"], "lawyer_assigned");
    assert_eq!(records[0]["changeNumber"], 2);
}

#[tokio::test]
async fn status_update_validates_and_tracks_old_value() {
    let (app, _guard) = common::test_app().await;
    let data = common::register_test_case(&app, "status.client@test.ae").await;
    let uri = format!("/api/cases/{}/status", data["case"]["id"].as_str().unwrap());

    let (status, resp) =
        common::put_json_authed(&app.router, &uri, &json!({ "status": "archived" }), &app.lawyer.token)
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap().starts_with("Invalid status."));

    let (status, resp) = common::put_json_authed(
        &app.router,
        &uri,
        &json!({ "status": "active", "notes": "Documents received" }),
        &app.lawyer.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["status"], "active");

    let (status, _) =
        common::put_json_authed(&app.router, &uri, &json!({ "status": "closed" }), &app.client.token)
            .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn client_cannot_read_someone_elses_case() {
    let (app, _guard) = common::test_app().await;
    let data = common::register_test_case(&app, "private.client@test.ae").await;
    let uri = format!("/api/cases/{}", data["case"]["id"].as_str().unwrap());

    let (status, resp) = common::get_authed(&app.router, &uri, &app.client.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["message"], "Access denied");

    let (status, resp) = common::get_authed(&app.router, &uri, &app.admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["client"]["email"], "private.client@test.ae");
}

#[tokio::test]
async fn malformed_case_id_is_rejected() {
    let (app, _guard) = common::test_app().await;

    let (status, _) = common::get_authed(&app.router, "/api/cases/not-a-uuid", &app.admin.token).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleting_case_removes_it() {
    let (app, _guard) = common::test_app().await;
    let data = common::register_test_case(&app, "delete.client@test.ae").await;
    let uri = format!("/api/cases/{}", data["case"]["id"].as_str().unwrap());

    let (status, resp) = common::delete_authed(&app.router, &uri, &app.coordinator.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["message"], "Case deleted successfully");

    let (status, _) = common::get_authed(&app.router, &uri, &app.admin.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn updating_case_tracks_each_changed_field_in_order() {
    let (app, _guard) = common::test_app().await;
    let data = common::register_test_case(&app, "update.client@test.ae").await;
    let case_id = data["case"]["id"].as_str().unwrap();
    let uri = format!("/api/cases/{case_id}");

    let body = json!({
        "description": "Unpaid end of service gratuity",
        "courtArea": "Deira",
        "salary": "7500",
        "jailVisiting": "No",
    });
    let (status, resp) = common::put_json_authed(&app.router, &uri, &body, &app.coordinator.token).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["message"], "Case updated successfully");
    assert_eq!(resp["data"]["courtArea"], "Deira");
    assert_eq!(resp["data"]["salary"], 7500.0);

    let (status, resp) = common::put_json_authed(&app.router, &uri, &body, &app.coordinator.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["message"], "No changes detected");

    let (_, resp) = common::put_json_authed(
        &app.router,
        &uri,
        &json!({ "courtArea": "Bur Dubai" }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(resp["data"]["courtArea"], "Bur Dubai");

    let (_, resp) =
        common::get_authed(&app.router, &format!("{uri}/tracking"), &app.coordinator.token).await;
    let records = resp["data"].as_array().unwrap();
    let summary: Vec<(i64, &str, &str, &str)> = records
        .iter()
        .map(|r| {
            (
                r["changeNumber"].as_i64().unwrap(),
                r["changeType"].as_str().unwrap(),
                r["oldValue"].as_str().unwrap_or(""),
                r["newValue"].as_str().unwrap_or(""),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (4, "field_update_courtArea", "Deira", "Bur Dubai"),
            (3, "field_update_courtArea", "", "Deira"),
            (2, "field_update_salary", "", "7500"),
            (1, "case_registered", "", "Case registered"),
        ]
    );
}

#[tokio::test]
async fn invalid_update_value_writes_nothing() {
    let (app, _guard) = common::test_app().await;
    let data = common::register_test_case(&app, "badupdate.client@test.ae").await;
    let uri = format!("/api/cases/{}", data["case"]["id"].as_str().unwrap());

    let (status, resp) = common::put_json_authed(
        &app.router,
        &uri,
        &json!({ "courtArea": "Deira", "hearingDate": "someday" }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Invalid value for hearingDate");

    let (_, resp) = common::get_authed(&app.router, &uri, &app.coordinator.token).await;
    assert_eq!(resp["data"]["courtArea"], serde_json::Value::Null);
    let (_, resp) =
        common::get_authed(&app.router, &format!("{uri}/tracking"), &app.coordinator.token).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_registration_leaves_no_client_account() {
    let (app, _guard) = common::test_app().await;
    let mut body = json!({
        "clientName": "Rolled Back",
        "clientEmail": "rollback.client@test.ae",
        "clientPhone": "+971501112299",
        "emirate": "Dubai",
        "urgencyLevel": "extreme",
    });

    let (status, resp) =
        common::post_json_authed(&app.router, "/api/cases", &body, &app.coordinator.token).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap().starts_with("Invalid urgency level."));

    let accounts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind("rollback.client@test.ae")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(accounts, 0);

    body["urgencyLevel"] = json!("high");
    let (status, resp) =
        common::post_json_authed(&app.router, "/api/cases", &body, &app.coordinator.token).await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["data"]["case"]["urgencyLevel"], "high");
    assert!(resp["data"]["temporaryPassword"].as_str().is_some());
}
