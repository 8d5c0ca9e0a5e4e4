use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

use crate::storage::DocumentStore;

/// Shared application state passed to Axum handlers via `State`.
/// Derives `FromRef` so handlers can extract `State<PgPool>` or
/// `State<DocumentStore>` directly.
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub store: DocumentStore,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, store: DocumentStore) -> Self {
        Self { pool, store }
    }
}

/// Create a lazy pool for `database_url`. No connection opens until the first query,
/// so each `#[tokio::test]` runtime gets working connections.
pub fn create_pool_for(database_url: &str) -> Result<Pool<Postgres>, sqlx::Error> {
    let max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect_lazy(database_url)
}

/// Create the pool from `DATABASE_URL`, loading `.env` first if present.
pub fn create_pool() -> Result<Pool<Postgres>, sqlx::Error> {
    let _ = dotenvy::dotenv();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| sqlx::Error::Configuration("DATABASE_URL must be set".into()))?;
    create_pool_for(&database_url)
}

pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// Periodic housekeeping: drop expired OTP sessions and expire stale
/// password-reset requests. Returns (otp sessions removed, resets expired).
pub async fn cleanup_expired(pool: &Pool<Postgres>) -> Result<(u64, u64), sqlx::Error> {
    let otps = sqlx::query("DELETE FROM otp_sessions WHERE expires_at < NOW()")
        .execute(pool)
        .await?
        .rows_affected();
    let resets = sqlx::query(
        r#"UPDATE password_resets
           SET status = 'rejected', rejection_reason = COALESCE(rejection_reason, 'Request expired')
           WHERE status = 'pending' AND expires_at < NOW()"#,
    )
    .execute(pool)
    .await?
    .rows_affected();
    Ok((otps, resets))
}
