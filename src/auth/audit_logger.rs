// Security event logging

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

const CREATE_AUDIT_TABLE: &str = "CREATE TABLE IF NOT EXISTS auth_audit_log (
    id BIGSERIAL PRIMARY KEY,
    identifier TEXT,
    event_type TEXT NOT NULL,
    reason TEXT,
    ip_address TEXT,
    user_agent TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

/// Authentication event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignUp,
    SignUpRejected { reason: String },
    SignInSuccess,
    SignInFailure { reason: String },
    SignOut,
}

impl AuthEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AuthEvent::SignUp => "SIGN_UP",
            AuthEvent::SignUpRejected { .. } => "SIGN_UP_REJECTED",
            AuthEvent::SignInSuccess => "SIGN_IN_SUCCESS",
            AuthEvent::SignInFailure { .. } => "SIGN_IN_FAILURE",
            AuthEvent::SignOut => "SIGN_OUT",
        }
    }

    fn reason(&self) -> Option<&str> {
        match self {
            AuthEvent::SignUpRejected { reason } | AuthEvent::SignInFailure { reason } => {
                Some(reason.as_str())
            }
            _ => None,
        }
    }
}

/// Request metadata attached to audit records
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Audit logger for authentication events
pub struct AuditLogger {
    db_pool: Option<Arc<PgPool>>,
}

impl AuditLogger {
    /// Create a new audit logger
    ///
    /// If `db_pool` is `None`, only structured logging will be used (no database persistence).
    pub fn new(db_pool: Option<Arc<PgPool>>) -> Self {
        Self { db_pool }
    }

    /// Create the audit table when a database is configured
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        if let Some(ref pool) = self.db_pool {
            sqlx::query(CREATE_AUDIT_TABLE).execute(pool.as_ref()).await?;
        }
        Ok(())
    }

    /// Log an authentication event
    ///
    /// Fire-and-forget: the database write runs on a spawned task and failures are
    /// only logged.
    pub fn log_auth_event(&self, event: AuthEvent, identifier: Option<&str>, meta: &RequestMeta) {
        let identifier = identifier.map(|s| s.to_string());

        match event {
            AuthEvent::SignInFailure { ref reason } | AuthEvent::SignUpRejected { ref reason } => {
                warn!(
                    event = event.event_type(),
                    identifier = ?identifier,
                    ip_address = ?meta.ip_address,
                    user_agent = ?meta.user_agent,
                    reason = %reason,
                    "Authentication rejected"
                );
            }
            _ => {
                info!(
                    event = event.event_type(),
                    identifier = ?identifier,
                    ip_address = ?meta.ip_address,
                    user_agent = ?meta.user_agent,
                    "Authentication event"
                );
            }
        }

        let Some(pool) = self.db_pool.clone() else {
            return;
        };
        let meta = meta.clone();

        tokio::spawn(async move {
            if let Err(e) = sqlx::query(
                "INSERT INTO auth_audit_log (identifier, event_type, reason, ip_address, user_agent, created_at)
                 VALUES ($1, $2, $3, $4, $5, NOW())",
            )
            .bind(&identifier)
            .bind(event.event_type())
            .bind(event.reason())
            .bind(&meta.ip_address)
            .bind(&meta.user_agent)
            .execute(pool.as_ref())
            .await
            {
                warn!(error = %e, "Failed to write audit log to database");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_types() {
        assert_eq!(AuthEvent::SignUp.event_type(), "SIGN_UP");
        assert_eq!(
            AuthEvent::SignInFailure { reason: "x".to_string() }.event_type(),
            "SIGN_IN_FAILURE"
        );
        assert_eq!(AuthEvent::SignOut.reason(), None);
        assert_eq!(
            AuthEvent::SignUpRejected { reason: "dup".to_string() }.reason(),
            Some("dup")
        );
    }

    #[tokio::test]
    async fn test_audit_logger_without_database() {
        let logger = AuditLogger::new(None);
        logger.ensure_schema().await.unwrap();

        // Should not panic
        logger.log_auth_event(
            AuthEvent::SignInSuccess,
            Some("u@x.com"),
            &RequestMeta {
                ip_address: Some("127.0.0.1".to_string()),
                user_agent: Some("test-agent".to_string()),
            },
        );
        logger.log_auth_event(
            AuthEvent::SignInFailure { reason: "Invalid credentials".to_string() },
            None,
            &RequestMeta::default(),
        );
    }
}
