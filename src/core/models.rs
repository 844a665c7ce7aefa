//! Domain models for the authentication core.
//!
//! Pure data structures: identifiers, credentials, user records and session data.
//! Nothing in here performs I/O.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::core::errors::AuthError;

/// Normalized account handle (an email address in practice).
///
/// Always lowercase, trimmed and non-empty. Two inputs that differ only by case or
/// surrounding whitespace produce the same `Identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Normalize and validate a raw identifier
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identifier {
    type Error = AuthError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Identifier::parse(&s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plaintext password wrapper with memory protection
///
/// Uses `secrecy::Secret` so the value never shows up in logs or debug output.
pub struct Password(Secret<String>);

/// bcrypt ignores everything past this many bytes
pub const MAX_PASSWORD_BYTES: usize = 72;

impl Password {
    /// Validate a submitted password: non-empty and within the bcrypt input limit.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        if raw.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        if raw.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::Validation(format!(
                "Password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        Ok(Self(Secret::new(raw.to_string())))
    }

    /// Expose the secret password (use with caution)
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("value", &"<REDACTED>")
            .finish()
    }
}

/// Opaque output of the salted password hashing function.
///
/// Only `PasswordHasher` and the credential stores can construct one, so a plaintext
/// value can never be stored in its place.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub(crate) fn from_stored(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PasswordHash(<REDACTED>)")
    }
}

/// Durable user record
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub identifier: Identifier,
    pub password_hash: PasswordHash,
    pub created_at: DateTime<Utc>,
}

/// Form body submitted to the sign-up and sign-in endpoints.
///
/// Missing fields deserialize to empty strings so they surface as a validation
/// failure rather than a framework rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialsForm {
    #[serde(default, alias = "identifier")]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CredentialsForm {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
        }
    }
}

/// Validated credential pair
#[derive(Debug)]
pub struct Credentials {
    pub identifier: Identifier,
    pub password: Password,
}

impl TryFrom<&CredentialsForm> for Credentials {
    type Error = AuthError;

    fn try_from(form: &CredentialsForm) -> Result<Self, Self::Error> {
        if form.email.trim().is_empty() && form.password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }
        Ok(Self {
            identifier: Identifier::parse(&form.email)?,
            password: Password::parse(&form.password)?,
        })
    }
}

/// Newtype wrapper around Uuid for type-safe session identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new SessionId from a Uuid
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying Uuid
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Generate a new random SessionId
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(SessionId)
    }
}

impl TryFrom<String> for SessionId {
    type Error = uuid::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Uuid::parse_str(&s).map(SessionId)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0.to_string()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `user` field of a session: who signed in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub identifier: Identifier,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            identifier: user.identifier.clone(),
        }
    }
}

/// Serialized session payload kept by the session store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

/// Result of the session-gate predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Authorized,
    Unauthorized,
}
