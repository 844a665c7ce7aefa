// Password hashing and verification (bcrypt)

use tracing::error;

use crate::core::errors::AuthError;
use crate::core::models::{Password, PasswordHash};

/// Work factor used when none is configured
pub const DEFAULT_COST: u32 = 10;

/// bcrypt's accepted cost range (mirrors the private bounds in the bcrypt crate)
pub(crate) const MIN_COST: u32 = 4;
pub(crate) const MAX_COST: u32 = 31;

/// bcrypt password hasher with a fixed work factor.
///
/// Hashing and verification run on tokio's blocking pool: the work factor makes them
/// CPU-bound for tens of milliseconds and they must not stall other requests.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Verified against on lookup misses so a miss costs the same as a mismatch
    dummy_hash: PasswordHash,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost (4..=31)
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(AuthError::ConfigurationError(format!(
                "bcrypt cost must be between {} and {}, got {}",
                MIN_COST,
                MAX_COST,
                cost
            )));
        }

        let dummy_hash = PasswordHash::from_stored(bcrypt::hash("dummy-password", cost)?);
        Ok(Self { cost, dummy_hash })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Derive a salted hash from a plaintext password
    pub async fn hash(&self, password: &Password) -> Result<PasswordHash, AuthError> {
        let plaintext = password.expose_secret().to_string();
        let cost = self.cost;

        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|e| {
                error!(error = %e, "Password hashing task failed");
                AuthError::HashingFailure(format!("Hashing task failed: {}", e))
            })??;

        Ok(PasswordHash::from_stored(hashed))
    }

    /// Compare a plaintext password against a stored hash
    pub async fn verify(&self, password: &Password, hash: &PasswordHash) -> Result<bool, AuthError> {
        let plaintext = password.expose_secret().to_string();
        let stored = hash.as_str().to_string();

        let matched = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &stored))
            .await
            .map_err(|e| {
                error!(error = %e, "Password verification task failed");
                AuthError::HashingFailure(format!("Verification task failed: {}", e))
            })??;

        Ok(matched)
    }

    /// Burn the same amount of work as a real verification. Always reports no match.
    pub async fn verify_dummy(&self, password: &Password) -> Result<bool, AuthError> {
        self.verify(password, &self.dummy_hash).await?;
        Ok(false)
    }
}
