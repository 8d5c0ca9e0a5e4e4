use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use serde_json::Value;
use shared_types::{roles_in_mask, AppError, Role};
use uuid::Uuid;

use super::middleware::{AuthFailure, CurrentUser};

/// Role bitmasks for `Authorized<ROLES>`.
pub mod roles {
    use shared_types::Role;

    pub const SUPER_ADMIN: u8 = Role::SuperAdmin.bit();
    pub const COORDINATOR: u8 = Role::Coordinator.bit();
    pub const COUNSELLOR: u8 = Role::Counsellor.bit();
    pub const LAWYER: u8 = Role::Lawyer.bit();
    pub const CLIENT: u8 = Role::Client.bit();

    pub const ADMIN_OR_COORDINATOR: u8 = SUPER_ADMIN | COORDINATOR;
    pub const ADMIN_OR_LAWYER: u8 = SUPER_ADMIN | LAWYER;
}

fn current_user(parts: &Parts) -> Result<CurrentUser, AppError> {
    if let Some(user) = parts.extensions.get::<CurrentUser>() {
        return Ok(user.clone());
    }
    match parts.extensions.get::<AuthFailure>() {
        Some(AuthFailure(err)) => Err(err.clone()),
        None => Err(AppError::unauthorized("No token provided. Authorization denied.")),
    }
}

/// Requires a valid access token for an active user.
pub struct AuthUser(pub CurrentUser);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_user(parts).map(AuthUser)
    }
}

/// The caller if a valid token was presented. Never fails.
pub struct MaybeUser(pub Option<CurrentUser>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

/// Requires the caller's role to be in the `ROLES` mask (see [`roles`]).
pub struct Authorized<const ROLES: u8>(pub CurrentUser);

impl<const ROLES: u8, S: Send + Sync> FromRequestParts<S> for Authorized<ROLES> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)?;
        if ROLES & user.role.bit() == 0 {
            let required: Vec<Value> = roles_in_mask(ROLES)
                .into_iter()
                .map(|r| Value::from(r.as_str()))
                .collect();
            return Err(
                AppError::forbidden("You do not have permission to access this resource.")
                    .with_detail("requiredRoles", required)
                    .with_detail("yourRole", user.role.as_str()),
            );
        }
        Ok(Authorized(user))
    }
}

pub struct SuperAdmin(pub CurrentUser);

impl<S: Send + Sync> FromRequestParts<S> for SuperAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)?;
        if user.role != Role::SuperAdmin {
            return Err(AppError::forbidden("Super Admin access required."));
        }
        Ok(SuperAdmin(user))
    }
}

/// Any role except `client`.
pub struct Staff(pub CurrentUser);

impl<S: Send + Sync> FromRequestParts<S> for Staff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts)?;
        if !user.role.is_staff() {
            return Err(AppError::forbidden("Staff access required."));
        }
        Ok(Staff(user))
    }
}

/// A caller may act on their own account; super admins on any.
pub fn ensure_self_or_admin(user: &CurrentUser, target: Uuid) -> Result<(), AppError> {
    if user.id() == target || user.is_super_admin() {
        Ok(())
    } else {
        Err(AppError::forbidden("You can only access your own resources."))
    }
}

/// Client address: first `x-forwarded-for` entry, else the peer socket.
pub struct ClientIp(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(crate::rate_limit::client_ip(&parts.headers, peer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::user_with_role;
    use axum::http::Request;

    fn parts_with(user: Option<CurrentUser>, failure: Option<AppError>) -> Parts {
        let (mut parts, _) = Request::new(()).into_parts();
        if let Some(u) = user {
            parts.extensions.insert(u);
        }
        if let Some(f) = failure {
            parts.extensions.insert(AuthFailure(f));
        }
        parts
    }

    #[tokio::test]
    async fn missing_token_message() {
        let mut parts = parts_with(None, None);
        let err = AuthUser::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.status_code_u16(), 401);
        assert_eq!(err.message, "No token provided. Authorization denied.");
    }

    #[tokio::test]
    async fn recorded_failure_is_returned() {
        let mut parts = parts_with(None, Some(AppError::unauthorized("User account is inactive.")));
        let err = AuthUser::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.message, "User account is inactive.");
    }

    #[tokio::test]
    async fn role_mask_allows_and_denies() {
        let mut parts = parts_with(Some(user_with_role(Role::Coordinator)), None);
        assert!(
            Authorized::<{ roles::ADMIN_OR_COORDINATOR }>::from_request_parts(&mut parts, &())
                .await
                .is_ok()
        );

        let mut parts = parts_with(Some(user_with_role(Role::Client)), None);
        let err = Authorized::<{ roles::ADMIN_OR_COORDINATOR }>::from_request_parts(&mut parts, &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code_u16(), 403);
        assert_eq!(err.details["yourRole"], "client");
        assert_eq!(
            err.details["requiredRoles"],
            serde_json::json!(["super_admin", "coordinator"])
        );
    }

    #[tokio::test]
    async fn staff_and_super_admin_guards() {
        let mut parts = parts_with(Some(user_with_role(Role::Lawyer)), None);
        assert!(Staff::from_request_parts(&mut parts, &()).await.is_ok());
        let err = SuperAdmin::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.message, "Super Admin access required.");

        let mut parts = parts_with(Some(user_with_role(Role::Client)), None);
        let err = Staff::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.message, "Staff access required.");
    }

    #[test]
    fn self_or_admin() {
        let lawyer = user_with_role(Role::Lawyer);
        assert!(ensure_self_or_admin(&lawyer, lawyer.id()).is_ok());
        assert!(ensure_self_or_admin(&lawyer, Uuid::new_v4()).is_err());
        let admin = user_with_role(Role::SuperAdmin);
        assert!(ensure_self_or_admin(&admin, Uuid::new_v4()).is_ok());
    }
}
