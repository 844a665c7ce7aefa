// Domain error types - user-caused failures are recoverable, faults never leak details

use thiserror::Error;

/// Main error type for the authentication core
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or empty identifier/password (HTTP 400)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Sign-up targets an identifier that is already stored (HTTP 409)
    #[error("Identifier already registered")]
    DuplicateIdentifier,

    /// Lookup miss or hash mismatch, deliberately indistinguishable (HTTP 401)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Password hashing primitive failed (HTTP 500)
    #[error("Hashing failure: {0}")]
    HashingFailure(String),

    /// Durable storage unreachable or returned an error (HTTP 503)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Session store or session cookie error (HTTP 500)
    #[error("Session error: {0}")]
    SessionError(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 400,
            AuthError::DuplicateIdentifier => 409,
            AuthError::InvalidCredentials => 401,
            AuthError::HashingFailure(_) => 500,
            AuthError::StoreUnavailable(_) => 503,
            AuthError::SessionError(_) => 500,
            AuthError::ConfigurationError(_) => 500,
        }
    }

    /// Whether the failure was caused by the submitted form and is recovered by
    /// re-rendering it. Everything else is a server fault.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AuthError::Validation(_) | AuthError::DuplicateIdentifier | AuthError::InvalidCredentials
        )
    }

    /// Get user-friendly error message (no sensitive information)
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(reason) => reason.clone(),
            AuthError::DuplicateIdentifier => {
                "An account with that email already exists".to_string()
            }
            AuthError::InvalidCredentials => "Invalid email or password".to_string(),
            AuthError::HashingFailure(_) => "Internal error".to_string(),
            AuthError::StoreUnavailable(_) => "Service unavailable".to_string(),
            AuthError::SessionError(_) => "Internal error".to_string(),
            AuthError::ConfigurationError(_) => "Internal error".to_string(),
        }
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AuthError::HashingFailure(err.to_string())
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::StoreUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::Validation("x".to_string()).status_code(), 400);
        assert_eq!(AuthError::DuplicateIdentifier.status_code(), 409);
        assert_eq!(AuthError::InvalidCredentials.status_code(), 401);
        assert_eq!(AuthError::HashingFailure("x".to_string()).status_code(), 500);
        assert_eq!(AuthError::StoreUnavailable("x".to_string()).status_code(), 503);
    }

    #[test]
    fn test_user_facing_split() {
        assert!(AuthError::Validation("x".to_string()).is_user_facing());
        assert!(AuthError::DuplicateIdentifier.is_user_facing());
        assert!(AuthError::InvalidCredentials.is_user_facing());
        assert!(!AuthError::HashingFailure("x".to_string()).is_user_facing());
        assert!(!AuthError::StoreUnavailable("x".to_string()).is_user_facing());
        assert!(!AuthError::SessionError("x".to_string()).is_user_facing());
    }

    #[test]
    fn test_user_messages_no_sensitive_data() {
        let err = AuthError::StoreUnavailable(
            "connection refused: postgres://admin:hunter2@db/users".to_string(),
        );
        let user_msg = err.user_message();

        assert!(!user_msg.contains("hunter2"));
        assert_eq!(user_msg, "Service unavailable");
    }

    #[test]
    fn test_validation_message_preserved() {
        let err = AuthError::Validation("Email is required".to_string());
        assert_eq!(err.user_message(), "Email is required");
    }
}
