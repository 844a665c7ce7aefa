//! Session cookie signing.
//!
//! `CookieSigner` binds a session id to the server secret with HMAC-SHA256 so a client
//! cannot forge or guess a valid session cookie.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, Secret};
use sha2::Sha256;
use uuid::Uuid;

use crate::core::errors::AuthError;
use crate::core::models::SessionId;

type HmacSha256 = Hmac<Sha256>;

/// Cookie format version, bumped if the layout changes
pub const COOKIE_VERSION: &str = "v1";

/// Minimum secret length accepted for signing
pub const MIN_SECRET_LENGTH: usize = 32;

pub struct CookieSigner {
    secret: Secret<Vec<u8>>,
}

impl CookieSigner {
    /// Create a signer from the configured session secret
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AuthError::ConfigurationError(format!(
                "Session secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        Ok(Self {
            secret: Secret::new(secret.as_bytes().to_vec()),
        })
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.secret.expose_secret())
            .map_err(|e| AuthError::SessionError(format!("Invalid signing key: {}", e)))
    }

    /// Produce the cookie value for a session id
    /// Format: "{version}.{uuid_b64}.{hmac_b64}"
    pub fn sign(&self, session_id: &SessionId) -> Result<String, AuthError> {
        let uuid_bytes = session_id.as_uuid().as_bytes();

        let mut mac = self.mac()?;
        mac.update(uuid_bytes);
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{}.{}.{}",
            COOKIE_VERSION,
            URL_SAFE_NO_PAD.encode(uuid_bytes),
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Recover the session id from a cookie value using constant-time comparison.
    /// Any malformed or forged value yields `None`.
    pub fn verify(&self, cookie_value: &str) -> Option<SessionId> {
        let parts: Vec<&str> = cookie_value.split('.').collect();
        if parts.len() != 3 || parts[0] != COOKIE_VERSION {
            return None;
        }

        let uuid_bytes = URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
        let provided_sig = URL_SAFE_NO_PAD.decode(parts[2]).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(&uuid_bytes);
        mac.verify_slice(&provided_sig).ok()?;

        Uuid::from_slice(&uuid_bytes).ok().map(SessionId::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_sign_and_verify() {
        let signer = CookieSigner::new(SECRET).unwrap();
        let id = SessionId::generate();
        let cookie = signer.sign(&id).unwrap();

        assert!(cookie.starts_with("v1."));
        assert_eq!(signer.verify(&cookie), Some(id));
    }

    #[test]
    fn test_rejects_short_secret() {
        assert!(matches!(
            CookieSigner::new("short"),
            Err(AuthError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_rejects_tampered_signature() {
        let signer = CookieSigner::new(SECRET).unwrap();
        let cookie = signer.sign(&SessionId::generate()).unwrap();

        let other = SessionId::generate();
        let forged_uuid = URL_SAFE_NO_PAD.encode(other.as_uuid().as_bytes());
        let parts: Vec<&str> = cookie.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], forged_uuid, parts[2]);

        assert_eq!(signer.verify(&forged), None);
    }

    #[test]
    fn test_rejects_other_secret() {
        let signer = CookieSigner::new(SECRET).unwrap();
        let other = CookieSigner::new("fedcba9876543210fedcba9876543210").unwrap();
        let cookie = signer.sign(&SessionId::generate()).unwrap();

        assert_eq!(other.verify(&cookie), None);
    }

    #[test]
    fn test_rejects_garbage() {
        let signer = CookieSigner::new(SECRET).unwrap();
        assert_eq!(signer.verify(""), None);
        assert_eq!(signer.verify("v1.only-two"), None);
        assert_eq!(signer.verify("v0.a.b"), None);
        assert_eq!(signer.verify("v1.!!!.???"), None);
        assert_eq!(signer.verify(&SessionId::generate().to_string()), None);
    }
}
