// Response types for HTTP endpoints

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;

use crate::api::views::{HtmlRenderer, View, ViewContext};
use crate::api::ViewRenderer;
use crate::core::errors::AuthError;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub credential_store: String,
    pub session_store: String,
}

/// Server fault rendered as the generic error page
///
/// `detail` carries the internal error text and is only populated in development.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            detail: None,
        }
    }

    /// Create from AuthError, exposing the internal error text only if asked to
    pub fn from_auth_error(err: AuthError, expose_details: bool) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            message: err.user_message(),
            detail: expose_details.then(|| err.to_string()),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let context = ViewContext {
            message: Some(self.message.clone()),
            detail: self.detail,
            status: Some(self.status.as_u16()),
            ..ViewContext::default()
        };

        match HtmlRenderer.render(View::Error, &context) {
            Ok(body) => (self.status, Html(body)).into_response(),
            Err(_) => (self.status, self.message).into_response(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::from_auth_error(err, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_auth_error_hides_detail_by_default() {
        let err: ApiError = AuthError::StoreUnavailable("pool timed out".to_string()).into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.message, "Service unavailable");
        assert!(err.detail.is_none());
    }

    #[test]
    fn test_from_auth_error_with_detail() {
        let err = ApiError::from_auth_error(AuthError::HashingFailure("bad cost".to_string()), true);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.detail.unwrap().contains("bad cost"));
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            credential_store: "connected".to_string(),
            session_store: "connected".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("credential_store"));
    }

    #[test]
    fn test_error_page_status() {
        let response = ApiError::not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
