// Axum session and gate middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, error, warn};

use crate::api::responses::ApiError;
use crate::api::AppState;
use crate::auth::audit_logger::RequestMeta;
use crate::auth::service::AuthService;
use crate::core::errors::AuthError;
use crate::core::models::{GateDecision, SessionId};
use crate::core::session::{Session, SessionHandle, SessionTransition};

/// Where unauthenticated requests for protected pages are sent
pub const SIGN_IN_PATH: &str = "/auth/signin";

/// Session middleware function
///
/// Restores the session named by the signed cookie, exposes it to handlers as a
/// `SessionHandle` extension, and persists whatever transition the handler made.
pub async fn session_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expose_details = app_state.config.is_development();

    // 1. Resolve the session id from the cookie (forged or malformed → none)
    let session_id = extract_cookie(request.headers(), &app_state.config.session_cookie_name)
        .and_then(|value| app_state.cookie_signer.verify(&value));

    // 2. Load session data (unknown or expired id → fresh session)
    let session = match session_id {
        Some(id) => match app_state.session_store.load(&id).await {
            Ok(Some(data)) => Session::loaded(id, data),
            Ok(None) => {
                debug!(session_id = %id, "Session not found or expired");
                Session::new()
            }
            Err(e) => {
                error!(error = %e, "Session load failed");
                return Err(ApiError::from_auth_error(e, expose_details));
            }
        },
        None => Session::new(),
    };

    // 3. Hand the session to the handler
    let handle = SessionHandle::new(session);
    request.extensions_mut().insert(handle.clone());
    let mut response = next.run(request).await;

    // 4. Persist the transition
    let session = handle.snapshot().await;
    match persist_session(&app_state, &session).await {
        Ok(Some(cookie)) => {
            response.headers_mut().append(header::SET_COOKIE, cookie);
            Ok(response)
        }
        Ok(None) => Ok(response),
        Err(e) => {
            error!(error = %e, "Session persistence failed");
            Err(ApiError::from_auth_error(e, expose_details))
        }
    }
}

/// Save or destroy the session according to its transition and return the
/// `Set-Cookie` value to send, if any
async fn persist_session(
    app_state: &AppState,
    session: &Session,
) -> Result<Option<HeaderValue>, AuthError> {
    let config = &app_state.config;

    match session.transition() {
        SessionTransition::Unchanged => Ok(None),
        SessionTransition::Established => {
            // Fresh id on every authentication; the previous one is dropped
            if let Some(old_id) = session.id() {
                app_state.session_store.destroy(&old_id).await?;
            }
            let new_id = SessionId::generate();
            app_state.session_store.save(&new_id, session.data()).await?;

            let value = app_state.cookie_signer.sign(&new_id)?;
            let cookie = build_cookie(
                &config.session_cookie_name,
                &value,
                config.session_ttl_secs,
                config.session_cookie_secure,
            );
            header_value(&cookie).map(Some)
        }
        SessionTransition::Destroyed => {
            if let Some(id) = session.id() {
                app_state.session_store.destroy(&id).await?;
            }
            let cookie = build_cookie(&config.session_cookie_name, "", 0, config.session_cookie_secure);
            header_value(&cookie).map(Some)
        }
    }
}

/// Gate middleware for protected routes
///
/// Unauthorized requests are redirected to the sign-in page, never rejected with an error.
pub async fn require_session_user(request: Request, next: Next) -> Response {
    let decision = match request.extensions().get::<SessionHandle>() {
        Some(handle) => AuthService::gate(&*handle.lock().await),
        None => {
            warn!("Session middleware missing in front of gated route");
            GateDecision::Unauthorized
        }
    };

    match decision {
        GateDecision::Authorized => next.run(request).await,
        GateDecision::Unauthorized => {
            debug!(path = %request.uri().path(), "Unauthenticated request redirected to sign-in");
            Redirect::to(SIGN_IN_PATH).into_response()
        }
    }
}

fn header_value(cookie: &str) -> Result<HeaderValue, AuthError> {
    HeaderValue::from_str(cookie)
        .map_err(|e| AuthError::SessionError(format!("Invalid cookie header: {}", e)))
}

/// Build a `Set-Cookie` value. `max_age_secs == 0` expires the cookie.
pub fn build_cookie(name: &str, value: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Extract a cookie value by name from the `Cookie` headers
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Extract client metadata for audit records
///
/// Checks `X-Forwarded-For` first (for proxied requests), then `X-Real-IP`.
pub fn extract_request_meta(headers: &HeaderMap) -> RequestMeta {
    let ip_address = headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("X-Real-IP"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    RequestMeta {
        ip_address,
        user_agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; sid=v1.abc.def; other=1".parse().unwrap());

        assert_eq!(extract_cookie(&headers, "sid"), Some("v1.abc.def".to_string()));
        assert_eq!(extract_cookie(&headers, "theme"), Some("dark".to_string()));
    }

    #[test]
    fn test_extract_cookie_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_cookie(&headers, "sid"), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "sidx=1".parse().unwrap());
        assert_eq!(extract_cookie(&headers, "sid"), None);
    }

    #[test]
    fn test_build_cookie() {
        let cookie = build_cookie("sid", "v1.a.b", 86400, false);
        assert_eq!(cookie, "sid=v1.a.b; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400");

        let expired = build_cookie("sid", "", 0, true);
        assert!(expired.contains("Max-Age=0"));
        assert!(expired.ends_with("; Secure"));
    }

    #[test]
    fn test_extract_request_meta() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Real-IP", "10.0.0.1".parse().unwrap());
        headers.insert(header::USER_AGENT, "test-agent".parse().unwrap());

        let meta = extract_request_meta(&headers);
        assert_eq!(meta.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent"));
    }
}
