//! Create or reset the super admin account.
//!
//! Reads `SEED_ADMIN_EMAIL` (default `admin@eyls.com`) and the required
//! `SEED_ADMIN_PASSWORD`. Re-running resets the password and clears 2FA.

use server::{auth::password::hash_password, db, repo};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@eyls.com".to_string());
    let password = std::env::var("SEED_ADMIN_PASSWORD")
        .map_err(|_| "SEED_ADMIN_PASSWORD must be set")?;
    server::auth::password::ensure_min_length(&password)?;

    let pool = db::create_pool()?;
    db::run_migrations(&pool).await?;

    let hash = hash_password(&password)?;
    let admin = repo::user::upsert_super_admin(&pool, &email, &hash).await?;
    println!("Super admin ready: {} ({})", admin.email, admin.id);
    Ok(())
}
