use shared_types::AppError;

/// True when the failure is about reaching the database rather than the query itself.
pub fn is_connection_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) | sqlx::Error::Tls(_)
    )
}

/// Convert a sqlx::Error into an AppError.
pub fn sqlx_to_app_error(err: sqlx::Error) -> AppError {
    if is_connection_error(&err) {
        tracing::error!(error = %err, "Database connection error");
        return AppError::service_unavailable("Database connection error. Please try again later.");
    }
    match &err {
        sqlx::Error::RowNotFound => AppError::not_found("Resource not found"),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // unique_violation
            Some("23505") => AppError::conflict("Resource already exists"),
            // foreign_key_violation
            Some("23503") => AppError::bad_request("Invalid reference. Related resource not found."),
            // check_violation / invalid_text_representation
            Some("23514") | Some("22P02") => AppError::bad_request(db_err.message().to_string()),
            _ => {
                tracing::error!(error = %err, "Database error");
                AppError::database("Database error")
            }
        },
        _ => {
            tracing::error!(error = %err, "Database error");
            AppError::database("Database error")
        }
    }
}

/// Extension trait providing `.into_app_error()` on sqlx::Error.
pub trait SqlxErrorExt {
    fn into_app_error(self) -> AppError;
}

impl SqlxErrorExt for sqlx::Error {
    fn into_app_error(self) -> AppError {
        sqlx_to_app_error(self)
    }
}

/// Trait for validating request DTOs before processing.
pub trait ValidateRequest {
    fn validate_request(&self) -> Result<(), AppError>;
}

impl<T: validator::Validate> ValidateRequest for T {
    fn validate_request(&self) -> Result<(), AppError> {
        self.validate().map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_is_404() {
        assert_eq!(sqlx_to_app_error(sqlx::Error::RowNotFound).status_code_u16(), 404);
    }

    #[test]
    fn pool_timeout_is_503() {
        let err = sqlx_to_app_error(sqlx::Error::PoolTimedOut);
        assert_eq!(err.status_code_u16(), 503);
        assert_eq!(err.message, "Database connection error. Please try again later.");
    }

    #[test]
    fn io_error_counts_as_connection_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(is_connection_error(&sqlx::Error::Io(io)));
        assert!(!is_connection_error(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn other_errors_are_500() {
        let err = sqlx_to_app_error(sqlx::Error::Protocol("bad".into()));
        assert_eq!(err.status_code_u16(), 500);
    }
}
