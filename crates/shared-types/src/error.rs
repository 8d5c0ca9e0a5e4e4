use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Categorization of application errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum AppErrorKind {
    NotFound,
    BadRequest,
    ValidationError,
    Conflict,
    DatabaseError,
    Unauthorized,
    Forbidden,
    Locked,
    RateLimited,
    ServiceUnavailable,
    InternalError,
}

impl fmt::Display for AppErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppErrorKind::NotFound => "NotFound",
            AppErrorKind::BadRequest => "BadRequest",
            AppErrorKind::ValidationError => "ValidationError",
            AppErrorKind::Conflict => "Conflict",
            AppErrorKind::DatabaseError => "DatabaseError",
            AppErrorKind::Unauthorized => "Unauthorized",
            AppErrorKind::Forbidden => "Forbidden",
            AppErrorKind::Locked => "Locked",
            AppErrorKind::RateLimited => "RateLimited",
            AppErrorKind::ServiceUnavailable => "ServiceUnavailable",
            AppErrorKind::InternalError => "InternalError",
        };
        f.write_str(name)
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Structured application error returned by every handler.
///
/// `details` carries extra keys that are merged into the JSON body, such as
/// `requiredRoles` on a role rejection or `yourEmirates` on a scoping failure.
#[derive(Debug, Clone, PartialEq)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub message: String,
    pub field_errors: Vec<FieldError>,
    pub details: Map<String, Value>,
}

/// Wire shape of an error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(ignore))]
    pub details: Map<String, Value>,
}

impl AppError {
    fn new(kind: AppErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            field_errors: Vec::new(),
            details: Map::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>, field_errors: Vec<FieldError>) -> Self {
        Self {
            field_errors,
            ..Self::new(AppErrorKind::ValidationError, message)
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Conflict, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::DatabaseError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Forbidden, message)
    }

    pub fn locked(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::Locked, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::RateLimited, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::ServiceUnavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::InternalError, message)
    }

    /// Attach an extra top-level key to the error body.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn status_code_u16(&self) -> u16 {
        match self.kind {
            AppErrorKind::NotFound => 404,
            AppErrorKind::BadRequest => 400,
            AppErrorKind::ValidationError => 400,
            AppErrorKind::Conflict => 409,
            AppErrorKind::DatabaseError => 500,
            AppErrorKind::Unauthorized => 401,
            AppErrorKind::Forbidden => 403,
            AppErrorKind::Locked => 423,
            AppErrorKind::RateLimited => 429,
            AppErrorKind::ServiceUnavailable => 503,
            AppErrorKind::InternalError => 500,
        }
    }

    pub fn to_response_body(&self) -> ErrorResponse {
        ErrorResponse {
            success: false,
            message: self.message.clone(),
            errors: if self.field_errors.is_empty() {
                None
            } else {
                Some(self.field_errors.clone())
            },
            details: self.details.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AppError {}

#[cfg(feature = "validation")]
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut field_errors: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                errs.first().map(|first| FieldError {
                    field: field.to_string(),
                    message: first
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field)),
                })
            })
            .collect();
        field_errors.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::validation("Validation error", field_errors)
    }
}

#[cfg(feature = "server")]
impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from_u16(self.status_code_u16())
            .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self.to_response_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_error_has_correct_kind() {
        let err = AppError::not_found("missing item");
        assert_eq!(err.kind, AppErrorKind::NotFound);
        assert_eq!(err.message, "missing item");
        assert!(err.field_errors.is_empty());
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(AppError::not_found("").status_code_u16(), 404);
        assert_eq!(AppError::validation("", Vec::new()).status_code_u16(), 400);
        assert_eq!(AppError::conflict("").status_code_u16(), 409);
        assert_eq!(AppError::unauthorized("").status_code_u16(), 401);
        assert_eq!(AppError::forbidden("").status_code_u16(), 403);
        assert_eq!(AppError::locked("").status_code_u16(), 423);
        assert_eq!(AppError::rate_limited("").status_code_u16(), 429);
        assert_eq!(AppError::service_unavailable("").status_code_u16(), 503);
        assert_eq!(AppError::internal("").status_code_u16(), 500);
    }

    #[test]
    fn body_omits_empty_errors() {
        let body = serde_json::to_value(AppError::bad_request("nope").to_response_body()).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "nope");
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn details_are_flattened_into_body() {
        let err = AppError::forbidden("You do not have access to Dubai.")
            .with_detail("yourEmirates", serde_json::json!(["Sharjah"]));
        let body = serde_json::to_value(err.to_response_body()).unwrap();
        assert_eq!(body["yourEmirates"][0], "Sharjah");
        assert_eq!(body["message"], "You do not have access to Dubai.");
    }

    #[test]
    fn validation_error_lists_fields() {
        let err = AppError::validation(
            "Validation error",
            vec![FieldError {
                field: "email".into(),
                message: "Valid email is required".into(),
            }],
        );
        let body = serde_json::to_value(err.to_response_body()).unwrap();
        assert_eq!(body["errors"][0]["field"], "email");
    }

    #[test]
    fn display_impl_formats_correctly() {
        let err = AppError::unauthorized("bad credentials");
        assert_eq!(format!("{}", err), "Unauthorized: bad credentials");
    }
}
