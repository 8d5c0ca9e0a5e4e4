use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared_types::AppError;
use uuid::Uuid;

/// Token type discriminators. Only access tokens authenticate API calls.
pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";
pub const TOKEN_TYPE_2FA_PENDING: &str = "2fa_pending";
pub const TOKEN_TYPE_RESET: &str = "reset";

/// JWT claims shared by every token type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: String,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token so two tokens minted in the same second differ.
    pub jti: String,
}

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Expired,
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => AppError::unauthorized("Token expired"),
            TokenError::Invalid => AppError::unauthorized("Invalid token"),
        }
    }
}

fn secret_for(typ: &str) -> Result<String, AppError> {
    let var = if typ == TOKEN_TYPE_REFRESH {
        "JWT_REFRESH_SECRET"
    } else {
        "JWT_SECRET"
    };
    match std::env::var(var) {
        Ok(s) if !s.is_empty() => Ok(s),
        _ => {
            tracing::error!(var, "JWT secret is not configured");
            Err(AppError::internal("Authentication is not configured"))
        }
    }
}

fn env_days(var: &str, default: i64) -> i64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|d: &i64| *d > 0)
        .unwrap_or(default)
}

pub fn access_token_lifetime() -> Duration {
    Duration::days(env_days("JWT_EXPIRES_IN_DAYS", 1))
}

pub fn refresh_token_lifetime() -> Duration {
    Duration::days(env_days("JWT_REFRESH_EXPIRES_IN_DAYS", 7))
}

fn issue(user_id: Uuid, role: &str, typ: &str, lifetime: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        typ: typ.to_string(),
        iat: now.timestamp(),
        exp: (now + lifetime).timestamp(),
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret_for(typ)?.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to sign token");
        AppError::internal("Failed to create token")
    })
}

pub fn create_access_token(user_id: Uuid, role: &str) -> Result<String, AppError> {
    issue(user_id, role, TOKEN_TYPE_ACCESS, access_token_lifetime())
}

pub fn create_refresh_token(user_id: Uuid, role: &str) -> Result<String, AppError> {
    issue(user_id, role, TOKEN_TYPE_REFRESH, refresh_token_lifetime())
}

/// Short-lived token bridging the password step and the TOTP step of login.
pub fn create_pending_2fa_token(user_id: Uuid, role: &str) -> Result<String, AppError> {
    issue(user_id, role, TOKEN_TYPE_2FA_PENDING, Duration::minutes(10))
}

/// Token embedded in emailed password-reset links.
pub fn create_reset_token(user_id: Uuid, role: &str) -> Result<String, AppError> {
    issue(user_id, role, TOKEN_TYPE_RESET, Duration::hours(1))
}

/// Decode a token and require the given `typ`. A token of another type is `Invalid`.
pub fn validate_token(token: &str, typ: &str) -> Result<Claims, TokenError> {
    let secret = secret_for(typ).map_err(|_| TokenError::Invalid)?;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?;
    if data.claims.typ != typ {
        return Err(TokenError::Invalid);
    }
    Ok(data.claims)
}

pub fn validate_access_token(token: &str) -> Result<Claims, TokenError> {
    validate_token(token, TOKEN_TYPE_ACCESS)
}

pub fn validate_refresh_token(token: &str) -> Result<Claims, TokenError> {
    validate_token(token, TOKEN_TYPE_REFRESH)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_secrets() {
        std::env::set_var("JWT_SECRET", "test-secret-key-for-jwt-unit-tests");
        std::env::set_var("JWT_REFRESH_SECRET", "test-refresh-secret-for-unit-tests");
    }

    #[test]
    fn create_and_validate_access_token() {
        setup_test_secrets();
        let id = Uuid::new_v4();
        let token = create_access_token(id, "lawyer").unwrap();
        let claims = validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, "lawyer");
        assert_eq!(claims.typ, TOKEN_TYPE_ACCESS);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_reports_expired() {
        setup_test_secrets();
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4(),
            role: "client".into(),
            typ: TOKEN_TYPE_ACCESS.into(),
            iat: (now - Duration::hours(3)).timestamp(),
            exp: (now - Duration::hours(2)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key-for-jwt-unit-tests"),
        )
        .unwrap();
        assert_eq!(validate_access_token(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn garbage_is_invalid() {
        setup_test_secrets();
        assert_eq!(validate_access_token("not.a.jwt").unwrap_err(), TokenError::Invalid);
        assert_eq!(validate_access_token("").unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        setup_test_secrets();
        let id = Uuid::new_v4();
        let refresh = create_refresh_token(id, "client").unwrap();
        let pending = create_pending_2fa_token(id, "client").unwrap();
        let reset = create_reset_token(id, "client").unwrap();
        let access = create_access_token(id, "client").unwrap();

        assert!(validate_access_token(&refresh).is_err());
        assert!(validate_access_token(&pending).is_err());
        assert!(validate_access_token(&reset).is_err());
        assert!(validate_refresh_token(&access).is_err());
        assert!(validate_token(&pending, TOKEN_TYPE_2FA_PENDING).is_ok());
        assert!(validate_token(&reset, TOKEN_TYPE_RESET).is_ok());
    }

    #[test]
    fn refresh_outlives_access() {
        setup_test_secrets();
        let id = Uuid::new_v4();
        let access = validate_access_token(&create_access_token(id, "client").unwrap()).unwrap();
        let refresh = validate_refresh_token(&create_refresh_token(id, "client").unwrap()).unwrap();
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn token_errors_map_to_401() {
        let expired: AppError = TokenError::Expired.into();
        assert_eq!(expired.status_code_u16(), 401);
        assert_eq!(expired.message, "Token expired");
        let invalid: AppError = TokenError::Invalid.into();
        assert_eq!(invalid.message, "Invalid token");
    }
}
