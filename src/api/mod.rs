// Axum web server layer

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    BoxError, Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;

pub mod handlers;
pub mod middleware;
pub mod responses;
pub mod views;

use crate::auth::audit_logger::AuditLogger;
use crate::auth::auth_middleware::{require_session_user, session_middleware};
use crate::auth::service::AuthService;
use crate::core::crypto::CookieSigner;
use crate::core::errors::AuthError;
use crate::core::models::{Identifier, PasswordHash, SessionData, SessionId, User};
use views::{View, ViewContext};

pub use crate::config::Config;

/// Application state containing all shared dependencies
///
/// All components are wrapped in Arc for shared ownership across async tasks.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub credential_store: Arc<dyn CredentialStore + Send + Sync>,
    pub session_store: Arc<dyn SessionStore + Send + Sync>,
    pub renderer: Arc<dyn ViewRenderer + Send + Sync>,
    pub cookie_signer: Arc<CookieSigner>,
    pub audit_logger: Arc<AuditLogger>,
    pub config: Arc<Config>,
}

/// Durable user records with a uniqueness guarantee on the identifier
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new record. Fails with `DuplicateIdentifier` if the identifier exists.
    async fn create(&self, identifier: &Identifier, password_hash: &PasswordHash) -> Result<User, AuthError>;
    /// Exact-match lookup on the normalized identifier
    async fn find_by_identifier(&self, identifier: &Identifier) -> Result<Option<User>, AuthError>;
    async fn ping(&self) -> Result<(), AuthError>;
}

/// Per-client session state, keyed by session id. Expiry is owned by the store.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionData>, AuthError>;
    async fn save(&self, session_id: &SessionId, data: &SessionData) -> Result<(), AuthError>;
    async fn destroy(&self, session_id: &SessionId) -> Result<(), AuthError>;
    async fn ping(&self) -> Result<(), AuthError>;
}

/// Template rendering: view name plus data in, response body out
pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: View, context: &ViewContext) -> Result<String, AuthError>;
}

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Request timeout (tower::timeout) with HandleErrorLayer
/// - Body size limit (tower-http::limit)
/// - Tracing (tower-http::trace)
/// - Session middleware - loads the session before the handler, persists it after
/// - Gate middleware - only on `/auth/private`
pub fn create_router(app_state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/auth/private", get(handlers::private_handler))
        .route_layer(from_fn(require_session_user));

    let router = Router::new()
        .route("/", get(handlers::home_handler))
        .route(
            "/auth/signup",
            get(handlers::signup_form_handler).post(handlers::signup_handler),
        )
        .route(
            "/auth/signin",
            get(handlers::signin_form_handler).post(handlers::signin_handler),
        )
        .route("/auth/signout", post(handlers::signout_handler))
        .merge(protected)
        .fallback(handlers::not_found_handler)
        .layer(from_fn_with_state(app_state.clone(), session_middleware))
        // Health bypasses the session layer
        .route("/health", get(handlers::health_handler))
        .layer(middleware::tracing_layer())
        .layer(middleware::body_size_limit_layer(app_state.config.body_size_limit_bytes));

    // HandleErrorLayer must come BEFORE timeout to catch the timeout error
    let middleware_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(app_state.config.request_timeout_secs))
        .into_inner();

    router.layer(middleware_stack)
}
