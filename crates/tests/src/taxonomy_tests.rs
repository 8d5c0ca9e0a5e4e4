use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{self, TestApp};

async fn create_type(app: &TestApp, name: &str, code: &str) -> String {
    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/case-types",
        &json!({ "name": name, "code": code }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    resp["data"]["id"].as_str().unwrap().to_string()
}

async fn create_category(app: &TestApp, name: &str, type_id: &str) -> String {
    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/case-categories",
        &json!({ "name": name, "caseTypeId": type_id }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    resp["data"]["id"].as_str().unwrap().to_string()
}

async fn create_sub_category(app: &TestApp, name: &str, category_id: &str) -> String {
    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/case-sub-categories",
        &json!({ "name": name, "categoryId": category_id }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    resp["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn only_super_admin_creates_case_types() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/case-types",
        &json!({ "name": "Labour", "code": "LAB" }),
        &app.coordinator.token,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(resp["message"], "Super Admin access required.");
}

#[tokio::test]
async fn duplicate_code_is_rejected() {
    let (app, _guard) = common::test_app().await;
    create_type(&app, "Labour", "LAB").await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/case-types",
        &json!({ "name": "Labour Disputes", "code": "LAB" }),
        &app.admin.token,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Case type with this code already exists");
}

#[tokio::test]
async fn list_returns_nested_tree() {
    let (app, _guard) = common::test_app().await;
    let type_id = create_type(&app, "Civil", "CIV").await;
    let category_id = create_category(&app, "Contracts", &type_id).await;
    create_sub_category(&app, "Lease", &category_id).await;

    let (status, resp) = common::get_authed(&app.router, "/api/case-types", &app.client.token).await;

    assert_eq!(status, StatusCode::OK);
    let tree = &resp["data"][0];
    assert_eq!(tree["name"], "Civil");
    assert_eq!(tree["categories"][0]["name"], "Contracts");
    assert_eq!(tree["categories"][0]["subCategories"][0]["name"], "Lease");
}

#[tokio::test]
async fn category_requires_existing_type() {
    let (app, _guard) = common::test_app().await;

    let (status, _) = common::post_json_authed(
        &app.router,
        "/api/case-categories",
        &json!({ "name": "Orphan", "caseTypeId": uuid::Uuid::new_v4() }),
        &app.admin.token,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_type_cascades_and_reports_counts() {
    let (app, _guard) = common::test_app().await;
    let type_id = create_type(&app, "Criminal", "CRM").await;
    let first = create_category(&app, "Theft", &type_id).await;
    create_category(&app, "Fraud", &type_id).await;
    create_sub_category(&app, "Shoplifting", &first).await;

    let (status, resp) = common::delete_authed(
        &app.router,
        &format!("/api/case-types/{type_id}"),
        &app.admin.token,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["deletedCategories"], 2);

    let (_, resp) =
        common::get_authed(&app.router, "/api/case-sub-categories", &app.admin.token).await;
    assert_eq!(resp["data"], json!([]));
}

#[tokio::test]
async fn export_is_a_bare_array_with_yes_no_flags() {
    let (app, _guard) = common::test_app().await;
    create_type(&app, "Family", "FAM").await;

    let (status, resp) =
        common::get_authed(&app.router, "/api/export/CaseTypes", &app.admin.token).await;

    assert_eq!(status, StatusCode::OK);
    let rows = resp.as_array().expect("export is a JSON array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["code"], "FAM");
    assert_eq!(rows[0]["isActive"], "Yes");
}

#[tokio::test]
async fn import_upserts_by_code_and_counts_failures() {
    let (app, _guard) = common::test_app().await;
    create_type(&app, "Old Name", "RENT").await;

    let rows = json!([
        { "name": "Rental", "code": "RENT", "isActive": "No" },
        { "name": "Banking", "code": "BANK" },
        { "name": "Missing code" },
    ]);
    let (status, resp) =
        common::post_json_authed(&app.router, "/api/import/CaseTypes", &rows, &app.admin.token).await;

    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["success"], 2);
    assert_eq!(resp["data"]["failed"], 1);
    assert_eq!(resp["message"], "Import completed. 2 successful, 1 failed.");

    let (_, resp) = common::get_authed(
        &app.router,
        "/api/case-types?includeInactive=true",
        &app.admin.token,
    )
    .await;
    let rental = resp["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["code"] == "RENT")
        .cloned()
        .unwrap_or(Value::Null);
    assert_eq!(rental["name"], "Rental");
    assert_eq!(rental["isActive"], false);
}

#[tokio::test]
async fn import_rejects_non_array_body() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/import/CaseTypes",
        &json!({ "name": "x" }),
        &app.admin.token,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Invalid data format. Expected an array of case types.");
}

#[tokio::test]
async fn occupation_sub_types_follow_their_type() {
    let (app, _guard) = common::test_app().await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/work-occupations/types",
        &json!({ "name": "Engineering" }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    let type_id = resp["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = common::post_json_authed(
        &app.router,
        "/api/work-occupations/types",
        &json!({ "name": "Engineering" }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/work-occupations/sub-types",
        &json!({ "name": "Civil Engineer", "occupationTypeId": type_id }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");

    let (status, resp) = common::get_authed(
        &app.router,
        &format!("/api/work-occupations/sub-types/by-type/{type_id}"),
        &app.client.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"][0]["name"], "Civil Engineer");

    let (status, resp) = common::delete_authed(
        &app.router,
        &format!("/api/work-occupations/types/{type_id}"),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["deletedSubTypes"], 1);
}
