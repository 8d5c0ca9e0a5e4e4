use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::State, Json};
use serde::Serialize;
use sqlx::{Pool, Postgres};

use crate::storage::DocumentStore;

static STARTED_AT: OnceLock<Instant> = OnceLock::new();

/// Mark process start for the uptime figure. Later calls are no-ops.
pub fn record_start_time() {
    STARTED_AT.get_or_init(Instant::now);
}

fn uptime_seconds() -> u64 {
    STARTED_AT.get().map_or(0, |t| t.elapsed().as_secs())
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    /// "ok" or "error".
    pub db: &'static str,
    /// Active document backend, "local" or "s3".
    pub storage: &'static str,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

async fn probe_database(pool: &Pool<Postgres>) -> &'static str {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health probe could not reach the database");
            "error"
        }
    }
}

/// Liveness plus a database round trip. Always 200 so load balancers can
/// tell a slow database apart from a dead process.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is up; `db` reports the database probe", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(
    State(pool): State<Pool<Postgres>>,
    State(store): State<DocumentStore>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        db: probe_database(&pool).await,
        storage: store.backend_name(),
        uptime_seconds: uptime_seconds(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
