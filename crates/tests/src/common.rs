use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::{Pool, Postgres};
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

/// Global mutex ensuring tests run sequentially against the shared database.
/// Each test acquires this lock before truncating and seeding.
static TEST_MUTEX: std::sync::LazyLock<Mutex<()>> = std::sync::LazyLock::new(|| Mutex::new(()));

pub const TEST_PASSWORD: &str = "Password123!";

const ALL_TABLES: &str = "users, password_resets, otp_sessions, case_types, case_categories, \
    case_sub_categories, work_occupation_types, work_occupation_sub_types, cases, case_tracking, \
    case_expenses, documents, consultations, payments, notifications, settings, subscriptions, \
    messages, case_inquiries, police_stations, jails, jail_visits, court_quotations";

/// A seeded account and a ready-to-use bearer token.
#[derive(Debug, Clone)]
pub struct Seeded {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Router plus one seeded user per role.
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Postgres>,
    pub admin: Seeded,
    pub coordinator: Seeded,
    pub counsellor: Seeded,
    pub lawyer: Seeded,
    pub client: Seeded,
}

async fn connect() -> Pool<Postgres> {
    let _ = dotenvy::dotenv();
    if std::env::var("JWT_SECRET").map(|s| s.is_empty()).unwrap_or(true) {
        std::env::set_var("JWT_SECRET", "elsy-test-access-secret");
    }
    if std::env::var("JWT_REFRESH_SECRET").map(|s| s.is_empty()).unwrap_or(true) {
        std::env::set_var("JWT_REFRESH_SECRET", "elsy-test-refresh-secret");
    }
    let upload_dir = std::env::temp_dir().join("elsy-test-uploads");
    std::env::set_var("UPLOAD_DIR", &upload_dir);

    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL or DATABASE_URL must be set for tests");

    let pool = server::db::create_pool_for(&database_url).expect("Failed to build test pool");
    server::db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    sqlx::query(&format!("TRUNCATE {ALL_TABLES} CASCADE"))
        .execute(&pool)
        .await
        .expect("Failed to truncate");
    pool
}

async fn seed_user(
    pool: &Pool<Postgres>,
    role: &str,
    email: &str,
    phone: &str,
    emirates: &[&str],
) -> Seeded {
    let hash = server::auth::password::hash_password(TEST_PASSWORD).expect("hash");
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password_hash, name, phone, role, is_active, phone_verified, assigned_emirates)
        VALUES ($1, $2, $3, $4, $5, TRUE, TRUE, $6)
        RETURNING id
        "#,
    )
    .bind(email)
    .bind(hash)
    .bind(format!("Test {role}"))
    .bind(phone)
    .bind(role)
    .bind(serde_json::json!(emirates))
    .fetch_one(pool)
    .await
    .expect("Failed to seed user");

    let token = server::auth::jwt::create_access_token(id, role).expect("Failed to mint token");
    Seeded {
        id,
        email: email.to_string(),
        token,
    }
}

async fn seeded_app(pool: Pool<Postgres>, router: Router) -> TestApp {
    let admin = seed_user(&pool, "super_admin", "admin@test.ae", "+971500000001", &[]).await;
    let coordinator =
        seed_user(&pool, "coordinator", "coordinator@test.ae", "+971500000002", &["Dubai"]).await;
    let counsellor =
        seed_user(&pool, "counsellor", "counsellor@test.ae", "+971500000003", &["Dubai"]).await;
    let lawyer = seed_user(&pool, "lawyer", "lawyer@test.ae", "+971500000004", &[]).await;
    let client = seed_user(&pool, "client", "client@test.ae", "+971500000005", &[]).await;

    TestApp {
        router,
        pool,
        admin,
        coordinator,
        counsellor,
        lawyer,
        client,
    }
}

/// Build the full application router against a freshly truncated database.
/// The returned `MutexGuard` must be held for the duration of the test.
pub async fn test_app() -> (TestApp, tokio::sync::MutexGuard<'static, ()>) {
    let guard = TEST_MUTEX.lock().await;
    let pool = connect().await;
    let store = server::storage::DocumentStore::from_env();
    store.ensure_ready().await;
    let router = server::openapi::api_router(pool.clone(), store);
    (seeded_app(pool, router).await, guard)
}

/// Same as [`test_app`] with a tight limit on the login and reset routes.
pub async fn test_app_rate_limited(
    max_requests: u32,
) -> (TestApp, tokio::sync::MutexGuard<'static, ()>) {
    let guard = TEST_MUTEX.lock().await;
    let pool = connect().await;
    let store = server::storage::DocumentStore::from_env();
    let state = server::db::AppState::new(pool.clone(), store);
    let limit = server::rate_limit::RateLimitState::new(
        max_requests,
        std::time::Duration::from_secs(60),
    );
    let router = server::openapi::api_router_with_rate_limit(state, limit);
    (seeded_app(pool, router).await, guard)
}

fn with_token(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(t) => builder.header("authorization", format!("Bearer {t}")),
        None => builder,
    }
}

fn json_request(method: &str, uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    with_token(Request::builder().method(method).uri(uri), token)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// POST JSON without credentials.
pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    send(app, json_request("POST", uri, body, None)).await
}

/// POST JSON with a bearer token.
pub async fn post_json_authed(app: &Router, uri: &str, body: &Value, token: &str) -> (StatusCode, Value) {
    send(app, json_request("POST", uri, body, Some(token))).await
}

/// PUT JSON with a bearer token.
pub async fn put_json_authed(app: &Router, uri: &str, body: &Value, token: &str) -> (StatusCode, Value) {
    send(app, json_request("PUT", uri, body, Some(token))).await
}

/// GET without credentials.
pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
    send(app, req).await
}

/// GET with a bearer token.
pub async fn get_authed(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let req = with_token(Request::builder().method("GET").uri(uri), Some(token))
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

/// DELETE with a bearer token.
pub async fn delete_authed(app: &Router, uri: &str, token: &str) -> (StatusCode, Value) {
    let req = with_token(Request::builder().method("DELETE").uri(uri), Some(token))
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

/// One part of a multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

const BOUNDARY: &str = "elsy-test-boundary";

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                field,
                file_name,
                content_type,
                bytes,
            } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(bytes);
                out.extend_from_slice(b"\r\n");
            }
        }
    }
    out.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    out
}

/// POST a multipart form, optionally with a bearer token.
pub async fn post_multipart(
    app: &Router,
    uri: &str,
    parts: &[Part<'_>],
    token: Option<&str>,
) -> (StatusCode, Value) {
    let req = with_token(Request::builder().method("POST").uri(uri), token)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    send(app, req).await
}

/// Send a request through the router and parse the response.
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, _, bytes) = send_raw(app, req).await;
    let body: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or(Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };
    (status, body)
}

/// Send a request and return raw bytes + status + headers (for CSV downloads).
pub async fn send_raw(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to send request");

    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");

    (status, headers, body_bytes.to_vec())
}

/// Register a case in Dubai through the API as the coordinator and return `data`.
pub async fn register_test_case(app: &TestApp, client_email: &str) -> Value {
    let body = serde_json::json!({
        "clientName": "Case Client",
        "clientEmail": client_email,
        "clientPhone": "+971501112233",
        "emirate": "Dubai",
        "caseType": "Labour",
        "description": "Unpaid end of service gratuity",
    });
    let (status, resp) =
        post_json_authed(&app.router, "/api/cases", &body, &app.coordinator.token).await;
    assert_eq!(status, StatusCode::CREATED, "Failed to register case: {resp}");
    resp["data"].clone()
}

/// Create a police station as the super admin and return its id.
pub async fn create_test_station(app: &TestApp, name: &str, emirate: &str) -> String {
    let body = serde_json::json!({
        "name": name,
        "emirate": emirate,
        "address": "Street 1",
        "contactNumber": "+97140000000",
    });
    let (status, resp) =
        post_json_authed(&app.router, "/api/police-stations", &body, &app.admin.token).await;
    assert_eq!(status, StatusCode::CREATED, "Failed to create station: {resp}");
    resp["data"]["id"].as_str().unwrap().to_string()
}

/// Create a jail under `station_id` and return its id.
pub async fn create_test_jail(app: &TestApp, station_id: &str, name: &str) -> String {
    let body = serde_json::json!({
        "name": name,
        "policeStationId": station_id,
        "jailType": "Men",
    });
    let (status, resp) = post_json_authed(&app.router, "/api/jails", &body, &app.admin.token).await;
    assert_eq!(status, StatusCode::CREATED, "Failed to create jail: {resp}");
    resp["data"]["id"].as_str().unwrap().to_string()
}
