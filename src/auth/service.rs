//! Authentication service: sign-up, sign-in, sign-out and the session gate.
//!
//! Every operation is a linear chain of fallible steps that short-circuits on the
//! first failure. The session is only mutated after every preceding step succeeded.
//! Nothing here knows about HTTP; handlers map the results to renders and redirects.

use std::sync::Arc;
use tracing::{debug, info};

use crate::api::CredentialStore;
use crate::auth::password::PasswordHasher;
use crate::core::errors::AuthError;
use crate::core::models::{Credentials, CredentialsForm, GateDecision, SessionUser, User};
use crate::core::session::Session;

pub struct AuthService {
    credential_store: Arc<dyn CredentialStore + Send + Sync>,
    hasher: PasswordHasher,
}

impl AuthService {
    pub fn new(credential_store: Arc<dyn CredentialStore + Send + Sync>, hasher: PasswordHasher) -> Self {
        Self {
            credential_store,
            hasher,
        }
    }

    /// Register a new account and authenticate the session as that account.
    ///
    /// Order: validate → hash → create → write session.
    pub async fn sign_up(
        &self,
        session: &mut Session,
        form: &CredentialsForm,
    ) -> Result<SessionUser, AuthError> {
        let credentials = Credentials::try_from(form)?;
        let password_hash = self.hasher.hash(&credentials.password).await?;
        let user = self
            .credential_store
            .create(&credentials.identifier, &password_hash)
            .await?;

        let session_user = SessionUser::from(&user);
        session.set_user(session_user.clone());

        info!(identifier = %user.identifier, "User signed up");
        Ok(session_user)
    }

    /// Check a credential pair and authenticate the session on success.
    ///
    /// A missing account and a wrong password both yield `InvalidCredentials`, and
    /// both pay for one bcrypt verification. A rejected attempt also signs out any
    /// user already on the session.
    pub async fn sign_in(
        &self,
        session: &mut Session,
        form: &CredentialsForm,
    ) -> Result<SessionUser, AuthError> {
        let credentials = Credentials::try_from(form)?;
        let user = self
            .credential_store
            .find_by_identifier(&credentials.identifier)
            .await?;

        let matched = match user {
            Some(ref user) => {
                self.hasher
                    .verify(&credentials.password, &user.password_hash)
                    .await?
            }
            None => self.hasher.verify_dummy(&credentials.password).await?,
        };

        let user = match (user, matched) {
            (Some(user), true) => user,
            (found, _) => {
                // Only the log distinguishes the two cases
                debug!(
                    identifier = %credentials.identifier,
                    account_exists = found.is_some(),
                    "Sign-in rejected"
                );
                // A rejected attempt never leaves an earlier user signed in
                if session.user().is_some() {
                    session.destroy();
                }
                return Err(AuthError::InvalidCredentials);
            }
        };

        let session_user = SessionUser::from(&user);
        session.set_user(session_user.clone());

        info!(identifier = %user.identifier, "User signed in");
        Ok(session_user)
    }

    /// Destroy the entire session, whatever its prior state
    pub fn sign_out(&self, session: &mut Session) {
        if let Some(user) = session.user() {
            info!(identifier = %user.identifier, "User signed out");
        }
        session.destroy();
    }

    /// Pure predicate over the session: authorized iff a non-empty user is present
    pub fn gate(session: &Session) -> GateDecision {
        match session.user() {
            Some(user) if !user.identifier.as_str().is_empty() => GateDecision::Authorized,
            _ => GateDecision::Unauthorized,
        }
    }

    /// Load the stored record for the session's user, if any
    pub async fn current_user(&self, session: &Session) -> Result<Option<User>, AuthError> {
        match session.user() {
            Some(user) => self.credential_store.find_by_identifier(&user.identifier).await,
            None => Ok(None),
        }
    }
}
