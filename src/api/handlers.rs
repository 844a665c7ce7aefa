// Request handlers for HTTP endpoints

use axum::{
    extract::{rejection::FormRejection, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    Extension, Form,
};
use std::time::Duration;
use tracing::{error, warn};

use crate::api::responses::{ApiError, HealthResponse};
use crate::api::views::{View, ViewContext};
use crate::api::AppState;
use crate::auth::audit_logger::AuthEvent;
use crate::auth::auth_middleware::{extract_request_meta, SIGN_IN_PATH};
use crate::core::errors::AuthError;
use crate::core::models::CredentialsForm;
use crate::core::session::SessionHandle;

/// Landing page after a successful sign-up or sign-in
pub const PRIVATE_PATH: &str = "/auth/private";

/// Landing page after sign-out
pub const HOME_PATH: &str = "/";

fn render(
    app_state: &AppState,
    status: StatusCode,
    view: View,
    context: &ViewContext,
) -> Result<Response, ApiError> {
    let body = app_state.renderer.render(view, context).map_err(|e| {
        error!(error = %e, view = view.name(), "View rendering failed");
        ApiError::from_auth_error(e, app_state.config.is_development())
    })?;
    Ok((status, Html(body)).into_response())
}

async fn render_page(app_state: &AppState, handle: &SessionHandle, view: View) -> Result<Response, ApiError> {
    let user = handle.lock().await.user().cloned();
    render(app_state, StatusCode::OK, view, &ViewContext::for_user(user))
}

/// GET /
pub async fn home_handler(
    State(app_state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
) -> Result<Response, ApiError> {
    render_page(&app_state, &handle, View::Home).await
}

/// GET /auth/signup
pub async fn signup_form_handler(
    State(app_state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
) -> Result<Response, ApiError> {
    render_page(&app_state, &handle, View::SignUp).await
}

/// GET /auth/signin
pub async fn signin_form_handler(
    State(app_state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
) -> Result<Response, ApiError> {
    render_page(&app_state, &handle, View::SignIn).await
}

/// GET /auth/private
///
/// Sits behind the gate middleware. The stored record is materialized so a session
/// that outlived its account is not honoured.
pub async fn private_handler(
    State(app_state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
) -> Result<Response, ApiError> {
    let mut session = handle.lock().await;

    let user = app_state
        .auth_service
        .current_user(&session)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to load current user");
            ApiError::from_auth_error(e, app_state.config.is_development())
        })?;

    match user {
        Some(_) => {
            let context = ViewContext::for_user(session.user().cloned());
            render(&app_state, StatusCode::OK, View::Private, &context)
        }
        None => {
            warn!("Session refers to a user that no longer exists");
            session.destroy();
            Ok(Redirect::to(SIGN_IN_PATH).into_response())
        }
    }
}

/// POST /auth/signup
///
/// Success establishes the session and redirects to the private page. Validation and
/// duplicate failures re-render the form with a message; faults go to the error page.
pub async fn signup_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Extension(handle): Extension<SessionHandle>,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let meta = extract_request_meta(&headers);
    let mut session = handle.lock().await;

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            return reject_malformed_form(&app_state, View::SignUp, session.user().cloned(), rejection)
        }
    };

    match app_state.auth_service.sign_up(&mut session, &form).await {
        Ok(user) => {
            app_state
                .audit_logger
                .log_auth_event(AuthEvent::SignUp, Some(user.identifier.as_str()), &meta);
            Ok(Redirect::to(PRIVATE_PATH).into_response())
        }
        Err(e) if e.is_user_facing() => {
            app_state.audit_logger.log_auth_event(
                AuthEvent::SignUpRejected { reason: e.to_string() },
                None,
                &meta,
            );
            rerender_form(&app_state, View::SignUp, &form, session.user().cloned(), e)
        }
        Err(e) => {
            error!(error = %e, "Sign-up failed");
            Err(ApiError::from_auth_error(e, app_state.config.is_development()))
        }
    }
}

/// POST /auth/signin
///
/// A missing account and a wrong password re-render the same message.
pub async fn signin_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Extension(handle): Extension<SessionHandle>,
    form: Result<Form<CredentialsForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let meta = extract_request_meta(&headers);
    let mut session = handle.lock().await;

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            return reject_malformed_form(&app_state, View::SignIn, session.user().cloned(), rejection)
        }
    };

    match app_state.auth_service.sign_in(&mut session, &form).await {
        Ok(user) => {
            app_state.audit_logger.log_auth_event(
                AuthEvent::SignInSuccess,
                Some(user.identifier.as_str()),
                &meta,
            );
            Ok(Redirect::to(PRIVATE_PATH).into_response())
        }
        Err(e) if e.is_user_facing() => {
            app_state.audit_logger.log_auth_event(
                AuthEvent::SignInFailure { reason: e.to_string() },
                None,
                &meta,
            );
            rerender_form(&app_state, View::SignIn, &form, session.user().cloned(), e)
        }
        Err(e) => {
            error!(error = %e, "Sign-in failed");
            Err(ApiError::from_auth_error(e, app_state.config.is_development()))
        }
    }
}

/// Unreadable bodies (wrong content type, bad encoding) get the form back like any
/// other validation failure. Oversized bodies keep their 413.
fn reject_malformed_form(
    app_state: &AppState,
    view: View,
    user: Option<crate::core::models::SessionUser>,
    rejection: FormRejection,
) -> Result<Response, ApiError> {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Ok(rejection.into_response());
    }

    warn!(error = %rejection, status = rejection.status().as_u16(), "Unreadable credentials form");
    let err = AuthError::Validation("Email and password are required".to_string());
    rerender_form(app_state, view, &CredentialsForm::default(), user, err)
}

fn rerender_form(
    app_state: &AppState,
    view: View,
    form: &CredentialsForm,
    user: Option<crate::core::models::SessionUser>,
    err: AuthError,
) -> Result<Response, ApiError> {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_REQUEST);
    let context = ViewContext::for_user(user)
        .with_message(err.user_message())
        .with_email(form.email.trim());
    render(app_state, status, view, &context)
}

/// POST /auth/signout
///
/// Destroys the session unconditionally and redirects home.
pub async fn signout_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Extension(handle): Extension<SessionHandle>,
) -> Response {
    let mut session = handle.lock().await;
    let identifier = session.user().map(|u| u.identifier.to_string());

    app_state.auth_service.sign_out(&mut session);
    app_state.audit_logger.log_auth_event(
        AuthEvent::SignOut,
        identifier.as_deref(),
        &extract_request_meta(&headers),
    );

    Redirect::to(HOME_PATH).into_response()
}

/// Health check handler
///
/// GET /health
///
/// Pings both stores with a short timeout. Always answers 200; degraded stores are
/// reported in the body.
pub async fn health_handler(State(app_state): State<AppState>) -> Json<HealthResponse> {
    const PING_TIMEOUT: Duration = Duration::from_millis(500);

    let credential_store = match tokio::time::timeout(PING_TIMEOUT, app_state.credential_store.ping()).await {
        Ok(Ok(_)) => "connected".to_string(),
        Ok(Err(e)) => {
            warn!(error = %e, "Credential store ping failed");
            "unavailable".to_string()
        }
        Err(_) => "slow: timeout".to_string(),
    };

    let session_store = match tokio::time::timeout(PING_TIMEOUT, app_state.session_store.ping()).await {
        Ok(Ok(_)) => "connected".to_string(),
        Ok(Err(e)) => {
            warn!(error = %e, "Session store ping failed");
            "unavailable".to_string()
        }
        Err(_) => "slow: timeout".to_string(),
    };

    let status = if credential_store == "connected" && session_store == "connected" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        credential_store,
        session_store,
    })
}

/// Catch-all for unknown routes
pub async fn not_found_handler() -> ApiError {
    ApiError::not_found()
}
