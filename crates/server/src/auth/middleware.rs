use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use shared_types::{AppError, Role, User};
use sqlx::{Pool, Postgres};

use super::jwt::validate_access_token;
use crate::error_convert::is_connection_error;
use crate::repo;

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub role: Role,
}

impl CurrentUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

/// Why a presented token did not yield a `CurrentUser`.
#[derive(Debug, Clone)]
pub struct AuthFailure(pub AppError);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Permissive auth middleware.
///
/// Never rejects a request: it records either a `CurrentUser` or an `AuthFailure`
/// and lets the extractors on each handler decide.
pub async fn auth_middleware(
    State(pool): State<Pool<Postgres>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()).map(str::to_owned) {
        match resolve_user(&pool, &token).await {
            Ok(current) => {
                req.extensions_mut().insert(current);
            }
            Err(failure) => {
                req.extensions_mut().insert(AuthFailure(failure));
            }
        }
    }
    next.run(req).await
}

async fn resolve_user(pool: &Pool<Postgres>, token: &str) -> Result<CurrentUser, AppError> {
    let claims = validate_access_token(token)
        .map_err(|_| AppError::unauthorized("Invalid or expired token."))?;

    let user = match repo::user::find_by_id(pool, claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AppError::unauthorized("User not found. Authorization denied.")),
        Err(e) if is_connection_error(&e) => {
            tracing::error!(error = %e, "Database unavailable during authentication");
            return Err(AppError::service_unavailable(
                "Database connection error. Please try again later.",
            ));
        }
        Err(e) => {
            tracing::error!(error = %e, "User lookup failed during authentication");
            return Err(AppError::unauthorized("Invalid or expired token."));
        }
    };

    if !user.is_active {
        return Err(AppError::unauthorized("User account is inactive."));
    }

    let role = user
        .role()
        .ok_or_else(|| AppError::unauthorized("Invalid or expired token."))?;

    Ok(CurrentUser { user, role })
}
