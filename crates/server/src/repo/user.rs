use std::collections::HashMap;

use chrono::{Datelike, Utc};
use serde_json::Value;
use shared_types::{
    AppError, ClientProfile, LawyerCaseStats, LawyerSummary, UpdateUserRequest, User, UserSummary,
};
use sqlx::{PgExecutor, Pool, Postgres};
use uuid::Uuid;

use crate::error_convert::SqlxErrorExt;
use crate::helpers;

/// Failed 2FA attempts before the account is locked.
pub const TWO_FACTOR_MAX_ATTEMPTS: i32 = 5;
pub const TWO_FACTOR_LOCK_MINUTES: i32 = 15;

/// Columns needed to insert a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub role: String,
    pub assigned_emirates: Value,
    pub created_by: Option<Uuid>,
    pub case_number: Option<String>,
    pub client_number: Option<String>,
    pub is_active: bool,
    pub specializations: Value,
    pub permissions: Value,
    pub profile: ClientProfile,
}

impl NewUser {
    pub fn new(email: &str, password_hash: String, name: &str, phone: &str, role: &str) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            password_hash,
            name: name.trim().to_string(),
            phone: phone.trim().to_string(),
            role: role.to_string(),
            assigned_emirates: Value::Array(Vec::new()),
            created_by: None,
            case_number: None,
            client_number: None,
            is_active: true,
            specializations: Value::Array(Vec::new()),
            permissions: Value::Array(Vec::new()),
            profile: ClientProfile::default(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Load a user by id. Returns the raw sqlx error so callers can tell a
/// connection failure apart from a bad query.
pub async fn find_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<User>, AppError> {
    find_by_id(pool, id).await.map_err(SqlxErrorExt::into_app_error)
}

/// Emails are matched case-insensitively.
pub async fn find_by_email(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Match a phone either as stored or in its `+971` normalized form.
pub async fn find_by_phone(pool: &Pool<Postgres>, phone: &str) -> Result<Option<User>, AppError> {
    let formatted = helpers::format_phone_number(phone);
    sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE phone = $1 OR phone = $2
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(phone.trim())
    .bind(formatted)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn find_by_email_or_phone(
    pool: &Pool<Postgres>,
    email: &str,
    phone: &str,
) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE LOWER(email) = LOWER($1) OR phone = $2
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(email.trim())
    .bind(phone.trim())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn client_number_exists(pool: &Pool<Postgres>, number: &str) -> Result<bool, AppError> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE client_number = $1)")
        .bind(number)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)
}

/// Next free `CL-{year}-NNNN`, counting from the number already issued this year.
pub async fn generate_client_number(pool: &Pool<Postgres>) -> Result<String, AppError> {
    let year = Utc::now().year();
    let prefix = helpers::client_number_prefix(year);
    let issued: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE client_number LIKE $1")
            .bind(format!("{prefix}%"))
            .fetch_one(pool)
            .await
            .map_err(SqlxErrorExt::into_app_error)?;

    for step in 0..100 {
        let candidate = helpers::client_number(year, issued + 1 + step);
        if !client_number_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
    }

    tracing::warn!(year, "Client number range exhausted, using clock fallback");
    Ok(helpers::fallback_client_number(
        year,
        Utc::now().timestamp_millis(),
    ))
}

pub async fn create<'e>(executor: impl PgExecutor<'e>, new: NewUser) -> Result<User, AppError> {
    let p = &new.profile;
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users
            (email, password_hash, name, phone, role, assigned_emirates, created_by,
             case_number, client_number, is_active, specializations, permissions,
             nationality, emirates_id, whatsapp_number, landline_number,
             company_name, company_address, company_email, company_phone,
             occupation, employer_name, address, city, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
        RETURNING *
        "#,
    )
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(&new.name)
    .bind(&new.phone)
    .bind(&new.role)
    .bind(&new.assigned_emirates)
    .bind(new.created_by)
    .bind(&new.case_number)
    .bind(&new.client_number)
    .bind(new.is_active)
    .bind(&new.specializations)
    .bind(&new.permissions)
    .bind(non_empty(&p.nationality))
    .bind(non_empty(&p.emirates_id))
    .bind(non_empty(&p.whatsapp_number))
    .bind(non_empty(&p.landline_number))
    .bind(non_empty(&p.company_name))
    .bind(non_empty(&p.company_address))
    .bind(non_empty(&p.company_email))
    .bind(non_empty(&p.company_phone))
    .bind(non_empty(&p.occupation))
    .bind(non_empty(&p.employer_name))
    .bind(non_empty(&p.address))
    .bind(non_empty(&p.city))
    .bind(non_empty(&p.notes))
    .fetch_one(executor)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Overwrite the detail fields that are present in `profile`; blank values are skipped.
pub async fn update_profile_details<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    profile: &ClientProfile,
) -> Result<User, AppError> {
    let p = profile;
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            nationality     = COALESCE($2, nationality),
            emirates_id     = COALESCE($3, emirates_id),
            whatsapp_number = COALESCE($4, whatsapp_number),
            landline_number = COALESCE($5, landline_number),
            company_name    = COALESCE($6, company_name),
            company_address = COALESCE($7, company_address),
            company_email   = COALESCE($8, company_email),
            company_phone   = COALESCE($9, company_phone),
            occupation      = COALESCE($10, occupation),
            employer_name   = COALESCE($11, employer_name),
            address         = COALESCE($12, address),
            city            = COALESCE($13, city),
            notes           = COALESCE($14, notes)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(non_empty(&p.nationality))
    .bind(non_empty(&p.emirates_id))
    .bind(non_empty(&p.whatsapp_number))
    .bind(non_empty(&p.landline_number))
    .bind(non_empty(&p.company_name))
    .bind(non_empty(&p.company_address))
    .bind(non_empty(&p.company_email))
    .bind(non_empty(&p.company_phone))
    .bind(non_empty(&p.occupation))
    .bind(non_empty(&p.employer_name))
    .bind(non_empty(&p.address))
    .bind(non_empty(&p.city))
    .bind(non_empty(&p.notes))
    .fetch_one(executor)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Paginated user list. `limit = None` returns every match.
pub async fn list(
    pool: &Pool<Postgres>,
    role: Option<&str>,
    is_active: Option<bool>,
    search: Option<&str>,
    limit: Option<i64>,
    offset: i64,
) -> Result<(Vec<User>, i64), AppError> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM users
        WHERE ($1::TEXT IS NULL OR role = $1)
          AND ($2::BOOLEAN IS NULL OR is_active = $2)
          AND ($3::TEXT IS NULL OR name ILIKE $3 OR email ILIKE $3 OR phone ILIKE $3)
        "#,
    )
    .bind(role)
    .bind(is_active)
    .bind(pattern.as_deref())
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE ($1::TEXT IS NULL OR role = $1)
          AND ($2::BOOLEAN IS NULL OR is_active = $2)
          AND ($3::TEXT IS NULL OR name ILIKE $3 OR email ILIKE $3 OR phone ILIKE $3)
        ORDER BY created_at DESC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(role)
    .bind(is_active)
    .bind(pattern.as_deref())
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok((rows, total))
}

/// Apply a partial update. Privileged fields must already be stripped by the caller
/// when the actor is not a super admin.
pub async fn update(
    pool: &Pool<Postgres>,
    id: Uuid,
    req: &UpdateUserRequest,
    password_hash: Option<String>,
) -> Result<Option<User>, AppError> {
    let p = &req.profile;
    let emirates = req
        .assigned_emirates
        .as_ref()
        .map(|list| Value::from(list.clone()));

    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            email             = COALESCE($2, email),
            name              = COALESCE($3, name),
            phone             = COALESCE($4, phone),
            password_hash     = COALESCE($5, password_hash),
            role              = COALESCE($6, role),
            is_active         = COALESCE($7, is_active),
            client_number     = COALESCE($8, client_number),
            assigned_emirates = COALESCE($9, assigned_emirates),
            specializations   = COALESCE($10, specializations),
            permissions       = COALESCE($11, permissions),
            nationality       = COALESCE($12, nationality),
            emirates_id       = COALESCE($13, emirates_id),
            whatsapp_number   = COALESCE($14, whatsapp_number),
            landline_number   = COALESCE($15, landline_number),
            company_name      = COALESCE($16, company_name),
            company_address   = COALESCE($17, company_address),
            company_email     = COALESCE($18, company_email),
            company_phone     = COALESCE($19, company_phone),
            occupation        = COALESCE($20, occupation),
            employer_name     = COALESCE($21, employer_name),
            address           = COALESCE($22, address),
            city              = COALESCE($23, city),
            notes             = COALESCE($24, notes)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(non_empty(&req.email).map(str::to_lowercase))
    .bind(non_empty(&req.name))
    .bind(non_empty(&req.phone))
    .bind(password_hash)
    .bind(non_empty(&req.role))
    .bind(req.is_active)
    .bind(non_empty(&req.client_number))
    .bind(emirates)
    .bind(req.specializations.as_ref())
    .bind(req.permissions.as_ref())
    .bind(p.nationality.as_deref())
    .bind(p.emirates_id.as_deref())
    .bind(p.whatsapp_number.as_deref())
    .bind(p.landline_number.as_deref())
    .bind(p.company_name.as_deref())
    .bind(p.company_address.as_deref())
    .bind(p.company_email.as_deref())
    .bind(p.company_phone.as_deref())
    .bind(p.occupation.as_deref())
    .bind(p.employer_name.as_deref())
    .bind(p.address.as_deref())
    .bind(p.city.as_deref())
    .bind(p.notes.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn update_password<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    password_hash: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(executor)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_assigned_emirates(
    pool: &Pool<Postgres>,
    id: Uuid,
    emirates: &[String],
) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET assigned_emirates = $2 WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(Value::from(emirates.to_vec()))
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

pub async fn delete(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected() > 0)
}

pub async fn record_login(
    pool: &Pool<Postgres>,
    id: Uuid,
    ip: Option<&str>,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            last_login    = NOW(),
            last_login_ip = COALESCE($2, last_login_ip)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(ip)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Phone OTP login proves ownership of the number.
pub async fn record_phone_login(pool: &Pool<Postgres>, id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET phone_verified = TRUE, last_login = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

// ── Two-factor state ────────────────────────────────────────────────

/// Store a fresh, unconfirmed secret and clear any lockout.
pub async fn begin_two_factor_setup(
    pool: &Pool<Postgres>,
    id: Uuid,
    secret: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users SET
            two_factor_secret          = $2,
            two_factor_enabled         = FALSE,
            two_factor_confirmed_at    = NULL,
            two_factor_failed_attempts = 0,
            two_factor_lock_until      = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(secret)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

pub async fn confirm_two_factor(pool: &Pool<Postgres>, id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users SET
            two_factor_enabled      = TRUE,
            two_factor_confirmed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Count a wrong code. The fifth failure locks the account and restarts the counter.
/// Returns true when this failure triggered the lock.
pub async fn record_two_factor_failure(pool: &Pool<Postgres>, id: Uuid) -> Result<bool, AppError> {
    let locked: Option<bool> = sqlx::query_scalar(
        r#"
        UPDATE users SET
            two_factor_failed_attempts = CASE
                WHEN two_factor_failed_attempts + 1 >= $2 THEN 0
                ELSE two_factor_failed_attempts + 1
            END,
            two_factor_lock_until = CASE
                WHEN two_factor_failed_attempts + 1 >= $2 THEN NOW() + make_interval(mins => $3)
                ELSE two_factor_lock_until
            END
        WHERE id = $1
        RETURNING two_factor_lock_until IS NOT NULL AND two_factor_lock_until > NOW()
        "#,
    )
    .bind(id)
    .bind(TWO_FACTOR_MAX_ATTEMPTS)
    .bind(TWO_FACTOR_LOCK_MINUTES)
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(locked.unwrap_or(false))
}

pub async fn reset_two_factor_failures(pool: &Pool<Postgres>, id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users SET
            two_factor_failed_attempts = 0,
            two_factor_lock_until      = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(())
}

/// Create the super admin, or reset the existing account's password and 2FA.
pub async fn upsert_super_admin(
    pool: &Pool<Postgres>,
    email: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, name, phone, role, is_active, phone_verified)
        VALUES (LOWER($1), $2, 'Super Admin', '+971000000000', 'super_admin', TRUE, TRUE)
        ON CONFLICT (email) DO UPDATE SET
            password_hash              = EXCLUDED.password_hash,
            role                       = 'super_admin',
            is_active                  = TRUE,
            two_factor_enabled         = FALSE,
            two_factor_secret          = NULL,
            two_factor_confirmed_at    = NULL,
            two_factor_failed_attempts = 0,
            two_factor_lock_until      = NULL
        RETURNING *
        "#,
    )
    .bind(email.trim())
    .bind(password_hash)
    .fetch_one(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// First client account matching a free-text lookup on any contact field.
pub async fn find_client_for_search(
    pool: &Pool<Postgres>,
    term: &str,
    normalized_phone: &str,
) -> Result<Option<User>, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE role = 'client'
          AND (name ILIKE $1
               OR email ILIKE $1
               OR phone ILIKE $1
               OR phone ILIKE $2
               OR client_number ILIKE $1
               OR emirates_id ILIKE $1
               OR whatsapp_number ILIKE $2
               OR landline_number ILIKE $2)
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(format!("%{term}%"))
    .bind(format!("%{normalized_phone}%"))
    .fetch_optional(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

// ── Directory and embedding ─────────────────────────────────────────

pub async fn active_lawyers(pool: &Pool<Postgres>) -> Result<Vec<LawyerSummary>, AppError> {
    sqlx::query_as::<_, LawyerSummary>(
        r#"
        SELECT id, name, email, phone,
               COALESCE(specializations, '[]'::jsonb) AS specializations
        FROM users
        WHERE role = 'lawyer' AND is_active
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)
}

/// Assigned and closed case counts for every lawyer holding at least one case.
pub async fn lawyer_case_stats(
    pool: &Pool<Postgres>,
) -> Result<HashMap<Uuid, LawyerCaseStats>, AppError> {
    let rows: Vec<(Uuid, i64, i64)> = sqlx::query_as(
        r#"
        SELECT lawyer_id,
               COUNT(*) AS assigned,
               COUNT(*) FILTER (WHERE status = 'closed') AS completed
        FROM cases
        WHERE lawyer_id IS NOT NULL
        GROUP BY lawyer_id
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows
        .into_iter()
        .map(|(id, assigned, completed)| (id, LawyerCaseStats { assigned, completed }))
        .collect())
}

/// Batch-load user summaries for embedding in other resources.
pub async fn summaries_by_ids(
    pool: &Pool<Postgres>,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, UserSummary>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut unique = ids.to_vec();
    unique.sort();
    unique.dedup();

    let rows = sqlx::query_as::<_, UserSummary>(
        "SELECT id, name, email, phone, role FROM users WHERE id = ANY($1)",
    )
    .bind(&unique)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows.into_iter().map(|s| (s.id, s)).collect())
}

/// Look up one embedded summary from a batch.
pub fn pick(map: &HashMap<Uuid, UserSummary>, id: Option<Uuid>) -> Option<UserSummary> {
    id.and_then(|id| map.get(&id).cloned())
}
