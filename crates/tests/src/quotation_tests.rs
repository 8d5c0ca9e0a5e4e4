use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{self, TestApp};

fn quotation_body(case_number: &str) -> Value {
    json!({
        "caseNumber": case_number,
        "emirate": "Dubai",
        "court": "Dubai Courts",
        "clientName": "Case Client",
        "feeAmount": "2500.50",
    })
}

async fn submit(app: &TestApp, case_number: &str, token: &str) -> Value {
    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/court-quotations",
        &quotation_body(case_number),
        token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "Failed to create quotation: {resp}");
    resp["data"].clone()
}

#[tokio::test]
async fn create_requires_core_fields() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/court-quotations",
        &json!({ "caseNumber": "CASE-2025-0001", "court": "Dubai Courts" }),
        &app.counsellor.token,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "All required fields must be filled");
}

#[tokio::test]
async fn fee_amount_accepts_numeric_strings() {
    let (app, _guard) = common::test_app().await;

    let data = submit(&app, "CASE-2025-0100", &app.counsellor.token).await;

    assert_eq!(data["status"], "pending");
    assert_eq!(data["feeAmount"], 2500.5);
    assert_eq!(data["createdBy"], app.counsellor.id.to_string());
}

#[tokio::test]
async fn approval_starts_the_matching_case() {
    let (app, _guard) = common::test_app().await;
    let case = common::register_test_case(&app, "quote.client@test.ae").await;
    let case_id = case["case"]["id"].as_str().unwrap().to_string();
    let case_number = case["case"]["caseNumber"].as_str().unwrap().to_string();

    let quotation = submit(&app, &case_number, &app.counsellor.token).await;
    let quotation_id = quotation["id"].as_str().unwrap();

    let (status, resp) = common::put_json_authed(
        &app.router,
        &format!("/api/court-quotations/{quotation_id}/status"),
        &json!({ "status": "approved", "remarks": "Fee agreed" }),
        &app.lawyer.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["status"], "approved");
    assert_eq!(resp["data"]["approvedBy"], app.lawyer.id.to_string());

    let (_, resp) =
        common::get_authed(&app.router, &format!("/api/cases/{case_id}"), &app.admin.token).await;
    assert_eq!(resp["data"]["status"], "in_progress");
    assert_eq!(resp["data"]["lawyerId"], app.lawyer.id.to_string());

    let (_, resp) = common::get_authed(
        &app.router,
        &format!("/api/cases/{case_id}/tracking"),
        &app.admin.token,
    )
    .await;
    let latest = &resp["data"][0];
    assert_eq!(latest["changeType"], "status_change");
    assert_eq!(latest["oldValue"], "pending");
    assert_eq!(latest["newValue"], "in_progress");
}

#[tokio::test]
async fn rejection_leaves_case_untouched() {
    let (app, _guard) = common::test_app().await;
    let case = common::register_test_case(&app, "reject.client@test.ae").await;
    let case_id = case["case"]["id"].as_str().unwrap().to_string();
    let case_number = case["case"]["caseNumber"].as_str().unwrap().to_string();
    let quotation = submit(&app, &case_number, &app.counsellor.token).await;
    let uri = format!("/api/court-quotations/{}/status", quotation["id"].as_str().unwrap());

    let (status, _) =
        common::put_json_authed(&app.router, &uri, &json!({ "status": "pending" }), &app.admin.token)
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resp) = common::put_json_authed(
        &app.router,
        &uri,
        &json!({ "status": "rejected", "rejectionReason": "Fee too high" }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["rejectionReason"], "Fee too high");

    let (_, resp) =
        common::get_authed(&app.router, &format!("/api/cases/{case_id}"), &app.admin.token).await;
    assert_eq!(resp["data"]["status"], "pending");
}

#[tokio::test]
async fn counsellors_see_only_their_own_quotations() {
    let (app, _guard) = common::test_app().await;
    let mine = submit(&app, "CASE-2025-0200", &app.counsellor.token).await;
    let theirs = submit(&app, "CASE-2025-0201", &app.coordinator.token).await;

    let (_, resp) =
        common::get_authed(&app.router, "/api/court-quotations", &app.counsellor.token).await;
    let list = resp["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], mine["id"]);

    let (status, resp) = common::get_authed(
        &app.router,
        &format!("/api/court-quotations/{}", theirs["id"].as_str().unwrap()),
        &app.counsellor.token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["message"], "Not authorized to view this quotation");

    let (_, resp) = common::get_authed(&app.router, "/api/court-quotations", &app.admin.token).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 2);
}
