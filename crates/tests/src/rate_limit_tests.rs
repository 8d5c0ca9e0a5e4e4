use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common;

#[tokio::test]
async fn login_returns_429_when_exceeded() {
    // Allow only 2 attempts per 60s window
    let (app, _guard) = common::test_app_rate_limited(2).await;
    let body = json!({ "email": app.client.email, "password": "wrong-password" });

    let (s1, _) = common::post_json(&app.router, "/api/auth/login", &body).await;
    assert_eq!(s1, StatusCode::UNAUTHORIZED, "First attempt should reach the handler");

    let (s2, _) = common::post_json(&app.router, "/api/auth/login", &body).await;
    assert_eq!(s2, StatusCode::UNAUTHORIZED, "Second attempt should reach the handler");

    let (s3, resp) = common::post_json(&app.router, "/api/auth/login", &body).await;
    assert_eq!(s3, StatusCode::TOO_MANY_REQUESTS, "Third attempt should be limited");
    assert_eq!(resp["success"], false);
    assert_eq!(resp["message"], "Too many requests. Please try again later.");
}

#[tokio::test]
async fn reset_routes_share_the_login_budget() {
    let (app, _guard) = common::test_app_rate_limited(1).await;

    let (s1, _) = common::post_json(
        &app.router,
        "/api/auth/login",
        &json!({ "email": app.client.email, "password": common::TEST_PASSWORD }),
    )
    .await;
    assert_eq!(s1, StatusCode::OK);

    let (s2, _) = common::post_json(
        &app.router,
        "/api/auth/request-reset",
        &json!({ "email": app.client.email }),
    )
    .await;
    assert_eq!(s2, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn other_routes_are_not_limited() {
    let (app, _guard) = common::test_app_rate_limited(1).await;

    for _ in 0..3 {
        let (status, _) = common::get_authed(&app.router, "/api/case-types", &app.admin.token).await;
        assert_eq!(status, StatusCode::OK);
    }
}
