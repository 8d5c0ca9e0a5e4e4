pub mod extractors;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod scope;
pub mod totp;

pub use extractors::{ensure_self_or_admin, roles, AuthUser, Authorized, ClientIp, MaybeUser, Staff, SuperAdmin};
pub use middleware::{auth_middleware, CurrentUser};
