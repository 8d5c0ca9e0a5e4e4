use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{self, TestApp};

/// Register a Dubai case with an estimated cost and return its id.
async fn costed_case(app: &TestApp, estimated_cost: f64) -> String {
    let body = json!({
        "clientName": "Ledger Client",
        "clientEmail": "ledger.client@test.ae",
        "clientPhone": "+971501119988",
        "emirate": "Dubai",
        "estimatedCost": estimated_cost,
    });
    let (status, resp) =
        common::post_json_authed(&app.router, "/api/cases", &body, &app.coordinator.token).await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    resp["data"]["case"]["id"].as_str().unwrap().to_string()
}

async fn totals(app: &TestApp, case_id: &str) -> (Value, Value) {
    let (status, resp) =
        common::get_authed(&app.router, &format!("/api/cases/{case_id}"), &app.admin.token).await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    (resp["data"]["paidAmount"].clone(), resp["data"]["remainingAmount"].clone())
}

#[tokio::test]
async fn case_payments_keep_paid_and_remaining_in_step() {
    let (app, _guard) = common::test_app().await;
    let case_id = costed_case(&app, 5000.0).await;
    let uri = format!("/api/cases/{case_id}/payments");
    assert_eq!(totals(&app, &case_id).await, (json!(0.0), json!(5000.0)));

    let (status, resp) = common::post_json_authed(
        &app.router,
        &uri,
        &json!({ "date": "2025-02-01", "amount": "1200" }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Date, payment type, and amount are required");

    let (status, resp) = common::post_json_authed(
        &app.router,
        &uri,
        &json!({
            "date": "2025-02-01",
            "paymentType": "cheque",
            "amount": "1200",
            "bank": "ENBD",
            "chequeNumber": "000123",
        }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    let first = resp["data"]["id"].as_str().unwrap().to_string();
    assert!(resp["data"]["invoiceNumber"].as_str().unwrap().starts_with("INV-"));
    assert_eq!(resp["data"]["status"], "completed");

    let (status, resp) = common::post_json_authed(
        &app.router,
        &uri,
        &json!({ "date": "2025-03-01", "paymentType": "cash", "amount": 800 }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    let second = resp["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(totals(&app, &case_id).await, (json!(2000.0), json!(3000.0)));

    let (status, resp) = common::put_json_authed(
        &app.router,
        &format!("{uri}/{first}"),
        &json!({ "amount": 1500 }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["paymentMethod"], "cheque");
    assert_eq!(totals(&app, &case_id).await, (json!(2300.0), json!(2700.0)));

    let (status, resp) =
        common::delete_authed(&app.router, &format!("{uri}/{second}"), &app.coordinator.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["message"], "Payment deleted");
    assert_eq!(totals(&app, &case_id).await, (json!(1500.0), json!(3500.0)));

    let (status, resp) =
        common::delete_authed(&app.router, &format!("{uri}/{second}"), &app.coordinator.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["message"], "Payment not found");

    let (_, resp) = common::get_authed(&app.router, &uri, &app.lawyer.token).await;
    let ledger = resp["data"].as_array().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["amount"], 1500.0);
}

#[tokio::test]
async fn case_expenses_crud() {
    let (app, _guard) = common::test_app().await;
    let case_id = costed_case(&app, 0.0).await;
    let uri = format!("/api/cases/{case_id}/expenses");

    let (status, resp) = common::post_json_authed(
        &app.router,
        &uri,
        &json!({ "expense": "Court filing fee" }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Date, expense, and amount are required");

    let (status, resp) = common::post_json_authed(
        &app.router,
        &uri,
        &json!({ "date": "2025-01-10", "expense": "Court filing fee", "amount": "350.75" }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["message"], "Expense added");
    assert_eq!(resp["data"]["amount"], 350.75);
    let fee = resp["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = common::post_json_authed(
        &app.router,
        &uri,
        &json!({ "date": "2025-02-15", "expense": "Translation", "amount": 120 }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, resp) = common::get_authed(&app.router, &uri, &app.coordinator.token).await;
    let names: Vec<&str> = resp["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["expense"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Translation", "Court filing fee"]);

    let (status, resp) = common::put_json_authed(
        &app.router,
        &format!("{uri}/{fee}"),
        &json!({ "amount": 400 }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["amount"], 400.0);
    assert_eq!(resp["data"]["expense"], "Court filing fee");

    let (status, resp) =
        common::delete_authed(&app.router, &format!("{uri}/{fee}"), &app.coordinator.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["message"], "Expense deleted");

    let (status, resp) = common::put_json_authed(
        &app.router,
        &format!("{uri}/{fee}"),
        &json!({ "amount": 1 }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(resp["message"], "Expense not found");

    let (_, resp) = common::get_authed(&app.router, &uri, &app.coordinator.token).await;
    assert_eq!(resp["data"].as_array().unwrap().len(), 1);
}
