use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "server=info,app=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    // try_init: the OTLP log bridge may already own the `log` facade.
    let json = std::env::var("ELSY_LOG_FORMAT").is_ok_and(|v| v == "json");
    let _ = if json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    server::config::load_feature_flags();
    let flags = server::config::feature_flags();

    if flags.telemetry {
        server::telemetry::init_telemetry();
    }
    init_tracing();
    server::health::record_start_time();

    let pool = server::db::create_pool()?;
    server::db::run_migrations(&pool).await?;

    let store = server::storage::DocumentStore::from_env();
    store.ensure_ready().await;
    tracing::info!(backend = store.backend_name(), "Document storage ready");

    // Background task: expire OTP sessions and stale reset requests every 15 minutes
    let cleanup_pool = pool.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(15 * 60));
        loop {
            interval.tick().await;
            match server::db::cleanup_expired(&cleanup_pool).await {
                Ok((otps, resets)) if otps + resets > 0 => {
                    tracing::info!(otps, resets, "Expired auth records cleaned up")
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Expired record cleanup failed"),
            }
        }
    });

    let router = server::openapi::api_router(pool, store);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "ELSY API listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
