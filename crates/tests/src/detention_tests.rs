use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common;

#[tokio::test]
async fn station_requires_known_emirate() {
    let (app, _guard) = common::test_app().await;

    let body = json!({
        "name": "Al Barsha",
        "emirate": "Atlantis",
        "address": "Street 1",
        "contactNumber": "04000000",
    });
    let (status, resp) =
        common::post_json_authed(&app.router, "/api/police-stations", &body, &app.admin.token).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Invalid emirate: Atlantis");
}

#[tokio::test]
async fn station_list_embeds_jails_and_filters_by_emirate() {
    let (app, _guard) = common::test_app().await;
    let dubai = common::create_test_station(&app, "Bur Dubai", "Dubai").await;
    common::create_test_station(&app, "Al Majaz", "Sharjah").await;
    common::create_test_jail(&app, &dubai, "Central Men").await;

    let (status, resp) =
        common::get_authed(&app.router, "/api/police-stations?emirate=Dubai", &app.lawyer.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["count"], 1);
    let station = &resp["data"]["policeStations"][0];
    assert_eq!(station["name"], "Bur Dubai");
    assert_eq!(station["jails"][0]["name"], "Central Men");

    let (_, resp) =
        common::get_authed(&app.router, "/api/police-stations?emirate=all", &app.lawyer.token).await;
    assert_eq!(resp["data"]["count"], 2);

    let (_, resp) =
        common::get_authed(&app.router, "/api/police-stations/stats/overview", &app.admin.token).await;
    assert_eq!(resp["data"]["total"], 2);
}

#[tokio::test]
async fn jail_inherits_station_emirate_and_validates_type() {
    let (app, _guard) = common::test_app().await;
    let station = common::create_test_station(&app, "Khalidiya", "Abu Dhabi").await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/jails",
        &json!({ "name": "Block A", "policeStationId": station, "jailType": "Adults" }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(resp["message"].as_str().unwrap().starts_with("Invalid jail type."));

    let jail_id = common::create_test_jail(&app, &station, "Block B").await;
    let (status, resp) =
        common::get_authed(&app.router, &format!("/api/jails/{jail_id}"), &app.counsellor.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["emirate"], "Abu Dhabi");
    assert_eq!(resp["data"]["policeStation"]["name"], "Khalidiya");
}

#[tokio::test]
async fn moving_station_to_new_emirate_updates_its_jails() {
    let (app, _guard) = common::test_app().await;
    let station = common::create_test_station(&app, "Moving", "Ajman").await;
    let jail_id = common::create_test_jail(&app, &station, "Holding").await;

    let (status, resp) = common::put_json_authed(
        &app.router,
        &format!("/api/police-stations/{station}"),
        &json!({ "emirate": "Fujairah" }),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");

    let (_, resp) =
        common::get_authed(&app.router, &format!("/api/jails/{jail_id}"), &app.admin.token).await;
    assert_eq!(resp["data"]["emirate"], "Fujairah");
}

#[tokio::test]
async fn deleting_station_reports_removed_jails() {
    let (app, _guard) = common::test_app().await;
    let station = common::create_test_station(&app, "Old Station", "Dubai").await;
    common::create_test_jail(&app, &station, "One").await;
    common::create_test_jail(&app, &station, "Two").await;

    let (status, resp) = common::delete_authed(
        &app.router,
        &format!("/api/police-stations/{station}"),
        &app.admin.token,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["data"]["deletedJails"], 2);
}

#[tokio::test]
async fn export_as_csv_is_an_attachment() {
    let (app, _guard) = common::test_app().await;
    common::create_test_station(&app, "Quote, Station", "Dubai").await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/police-stations/export?format=csv")
        .header("authorization", format!("Bearer {}", app.admin.token))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = common::send_raw(&app.router, req).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"police_stations.csv\""
    );
    let text = String::from_utf8(body).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("name,emirate,address"));
    assert!(lines.next().unwrap().starts_with("\"Quote, Station\",Dubai"));
}

#[tokio::test]
async fn import_reports_per_row_errors() {
    let (app, _guard) = common::test_app().await;

    let body = json!({
        "data": [
            { "name": "Imported", "emirate": "Sharjah" },
            { "name": "No Emirate" },
            { "name": "Bad", "emirate": "Nowhere" },
        ]
    });
    let (status, resp) =
        common::post_json_authed(&app.router, "/api/police-stations/import", &body, &app.admin.token)
            .await;

    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["message"], "Import completed");
    assert_eq!(resp["data"]["success"], 1);
    assert_eq!(resp["data"]["failed"], 2);
    assert_eq!(resp["data"]["errors"][0]["item"], "No Emirate");
    assert_eq!(resp["data"]["errors"][0]["error"], "Name and Emirate are required");

    let (_, resp) = common::get_authed(&app.router, "/api/police-stations", &app.admin.token).await;
    assert_eq!(resp["data"]["policeStations"][0]["address"], "N/A");
}

#[tokio::test]
async fn import_accepts_csv_text() {
    let (app, _guard) = common::test_app().await;

    let body = json!({
        "format": "csv",
        "data": "name,emirate,address,contactNumber\nDeira,Dubai,Deira St,042222222\n",
    });
    let (status, resp) =
        common::post_json_authed(&app.router, "/api/police-stations/import", &body, &app.admin.token)
            .await;

    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["success"], 1);
}

#[tokio::test]
async fn jail_visit_lifecycle() {
    let (app, _guard) = common::test_app().await;
    let station = common::create_test_station(&app, "Visit Station", "Dubai").await;
    let jail_id = common::create_test_jail(&app, &station, "Visit Jail").await;

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/jail-visits",
        &json!({ "caseNumber": "CASE-2025-0001", "jailId": jail_id }),
        &app.counsellor.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "All fields are required");

    let (status, resp) = common::post_json_authed(
        &app.router,
        "/api/jail-visits",
        &json!({
            "caseNumber": "CASE-2025-0001",
            "accusedName": "A. Person",
            "jailId": jail_id,
            "requestedDate": "2025-07-01",
            "requestedTime": "10:00",
            "reason": "Statement review",
        }),
        &app.counsellor.token,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{resp}");
    assert_eq!(resp["data"]["status"], "pending");
    assert_eq!(resp["data"]["emirate"], "Dubai");
    let visit_id = resp["data"]["id"].as_str().unwrap().to_string();

    // Coordinators may not review.
    let review_uri = format!("/api/jail-visits/{visit_id}/status");
    let (status, _) = common::put_json_authed(
        &app.router,
        &review_uri,
        &json!({ "status": "approved" }),
        &app.coordinator.token,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resp) = common::put_json_authed(
        &app.router,
        &review_uri,
        &json!({ "status": "rejected", "remarks": "Visiting hours closed" }),
        &app.lawyer.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{resp}");
    assert_eq!(resp["data"]["status"], "rejected");
    assert_eq!(resp["data"]["rejectionReason"], "Visiting hours closed");

    let (status, resp) = common::delete_authed(
        &app.router,
        &format!("/api/jail-visits/{visit_id}"),
        &app.counsellor.token,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["message"], "Cannot delete processed requests");

    let (status, _) = common::delete_authed(
        &app.router,
        &format!("/api/jail-visits/{visit_id}"),
        &app.admin.token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn counsellor_only_sees_own_visits() {
    let (app, _guard) = common::test_app().await;
    let station = common::create_test_station(&app, "Scope Station", "Dubai").await;
    let jail_id = common::create_test_jail(&app, &station, "Scope Jail").await;

    let body = json!({
        "caseNumber": "CASE-2025-0002",
        "accusedName": "B. Person",
        "jailId": jail_id,
        "requestedDate": "2025-07-02",
        "requestedTime": "11:00",
        "reason": "Follow-up",
    });
    let (status, _) =
        common::post_json_authed(&app.router, "/api/jail-visits", &body, &app.admin.token).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, resp) = common::get_authed(&app.router, "/api/jail-visits", &app.counsellor.token).await;
    assert_eq!(resp["data"]["count"], 0);

    let (_, resp) = common::get_authed(&app.router, "/api/jail-visits", &app.admin.token).await;
    assert_eq!(resp["data"]["count"], 1);
    assert_eq!(resp["data"]["jailVisits"][0]["jail"]["name"], "Scope Jail");
}
