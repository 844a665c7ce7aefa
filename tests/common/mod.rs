// Common test utilities and helpers for all test modules

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use session_auth::api::views::HtmlRenderer;
use session_auth::api::{create_router, AppState, CredentialStore, SessionStore};
use session_auth::auth::audit_logger::AuditLogger;
use session_auth::auth::credential_store::MemoryCredentialStore;
use session_auth::auth::password::PasswordHasher;
use session_auth::auth::service::AuthService;
use session_auth::config::Config;
use session_auth::core::crypto::CookieSigner;
use session_auth::core::errors::AuthError;
use session_auth::core::models::*;
use session_auth::state::session_store::MemorySessionStore;
use std::sync::Arc;
use tower::ServiceExt;

/// Credential store whose every call fails as if the database were down
#[derive(Default)]
pub struct FailingCredentialStore {
    pub ping_should_fail: bool,
}

#[async_trait::async_trait]
impl CredentialStore for FailingCredentialStore {
    async fn create(&self, _identifier: &Identifier, _password_hash: &PasswordHash) -> Result<User, AuthError> {
        Err(AuthError::StoreUnavailable("connection refused".to_string()))
    }

    async fn find_by_identifier(&self, _identifier: &Identifier) -> Result<Option<User>, AuthError> {
        Err(AuthError::StoreUnavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), AuthError> {
        if self.ping_should_fail {
            return Err(AuthError::StoreUnavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

/// Session store with selectable failures
pub struct MockSessionStore {
    pub inner: MemorySessionStore,
    pub load_should_fail: bool,
    pub save_should_fail: bool,
}

impl Default for MockSessionStore {
    fn default() -> Self {
        Self {
            inner: MemorySessionStore::new(60),
            load_should_fail: false,
            save_should_fail: false,
        }
    }
}

impl MockSessionStore {
    pub fn failing_load() -> Self {
        Self {
            load_should_fail: true,
            ..Self::default()
        }
    }

    pub fn failing_save() -> Self {
        Self {
            save_should_fail: true,
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl SessionStore for MockSessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionData>, AuthError> {
        if self.load_should_fail {
            return Err(AuthError::SessionError("Redis connection failed".to_string()));
        }
        self.inner.load(session_id).await
    }

    async fn save(&self, session_id: &SessionId, data: &SessionData) -> Result<(), AuthError> {
        if self.save_should_fail {
            return Err(AuthError::SessionError("Redis connection failed".to_string()));
        }
        self.inner.save(session_id, data).await
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<(), AuthError> {
        self.inner.destroy(session_id).await
    }

    async fn ping(&self) -> Result<(), AuthError> {
        if self.load_should_fail {
            return Err(AuthError::SessionError("Redis connection failed".to_string()));
        }
        Ok(())
    }
}

/// Build app state around the given stores
pub fn create_app_state_with(
    credential_store: Arc<dyn CredentialStore + Send + Sync>,
    session_store: Arc<dyn SessionStore + Send + Sync>,
    config: Config,
) -> AppState {
    let hasher = PasswordHasher::new(config.bcrypt_cost).unwrap();
    let cookie_signer = CookieSigner::new("test-session-secret-0123456789abcdef").unwrap();

    AppState {
        auth_service: Arc::new(AuthService::new(credential_store.clone(), hasher)),
        credential_store,
        session_store,
        renderer: Arc::new(HtmlRenderer),
        cookie_signer: Arc::new(cookie_signer),
        audit_logger: Arc::new(AuditLogger::new(None)),
        config: Arc::new(config),
    }
}

/// App state backed by in-memory stores
pub fn create_test_app_state() -> AppState {
    create_app_state_with(
        Arc::new(MemoryCredentialStore::new()),
        Arc::new(MemorySessionStore::new(60)),
        Config::test_config(),
    )
}

pub fn create_test_app(app_state: AppState) -> Router {
    create_router(&app_state).with_state(app_state)
}

/// Send one request through a clone of the router
pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// URL-encode a credential form body
pub fn credentials_body(email: &str, password: &str) -> String {
    let encode = |s: &str| {
        url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>()
    };
    format!("email={}&password={}", encode(email), encode(password))
}

/// The `name=value` pair from the response's Set-Cookie header, ready to send back
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie_header(response).and_then(|v| v.split(';').next().map(|s| s.trim().to_string()))
}

pub fn set_cookie_header(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Sign up through HTTP and return the session cookie
pub async fn sign_up(app: &Router, email: &str, password: &str) -> String {
    let response = send(app, post_form("/auth/signup", &credentials_body(email, password), None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    session_cookie(&response).expect("sign-up should set a session cookie")
}
