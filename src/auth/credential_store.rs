// Credential storage: PostgreSQL-backed with an in-memory fallback

use crate::api::CredentialStore;
use crate::core::errors::AuthError;
use crate::core::models::{Identifier, PasswordHash, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

const CREATE_USERS_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY,
    identifier TEXT NOT NULL UNIQUE CHECK (identifier <> ''),
    password_hash TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)";

/// Database row structure for user lookup
#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    identifier: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AuthError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let identifier = Identifier::parse(&row.identifier).map_err(|_| {
            AuthError::StoreUnavailable(format!("Stored user {} has an empty identifier", row.id))
        })?;
        Ok(User {
            id: row.id,
            identifier,
            password_hash: PasswordHash::from_stored(row.password_hash),
            created_at: row.created_at,
        })
    }
}

/// Database-backed credential store with in-memory caching
///
/// Records are never updated or deleted, so cached lookups cannot go stale.
pub struct DbCredentialStore {
    db_pool: PgPool,
    cache: Cache<String, Arc<User>>,
}

impl DbCredentialStore {
    /// Create a new database-backed credential store
    pub fn new(db_pool: PgPool, cache_ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(cache_ttl_secs))
            .max_capacity(10_000)
            .build();

        Self { db_pool, cache }
    }

    /// Create the `users` table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<(), AuthError> {
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&self.db_pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for DbCredentialStore {
    async fn create(
        &self,
        identifier: &Identifier,
        password_hash: &PasswordHash,
    ) -> Result<User, AuthError> {
        // The unique index decides concurrent sign-ups: losers get no row back
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, identifier, password_hash, created_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (identifier) DO NOTHING
             RETURNING id, identifier, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(identifier.as_str())
        .bind(password_hash.as_str())
        .fetch_optional(&self.db_pool)
        .await?;

        let user = User::try_from(row.ok_or(AuthError::DuplicateIdentifier)?)?;
        self.cache
            .insert(identifier.as_str().to_string(), Arc::new(user.clone()))
            .await;
        Ok(user)
    }

    async fn find_by_identifier(&self, identifier: &Identifier) -> Result<Option<User>, AuthError> {
        if let Some(cached) = self.cache.get(identifier.as_str()).await {
            return Ok(Some((*cached).clone()));
        }

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, identifier, password_hash, created_at
             FROM users
             WHERE identifier = $1",
        )
        .bind(identifier.as_str())
        .fetch_optional(&self.db_pool)
        .await?;

        let user = row.map(User::try_from).transpose()?;

        if let Some(ref user) = user {
            self.cache
                .insert(identifier.as_str().to_string(), Arc::new(user.clone()))
                .await;
        }

        Ok(user)
    }

    async fn ping(&self) -> Result<(), AuthError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}

/// Process-local credential store
///
/// Used when no database is configured. Records are lost on restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<Identifier, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create(
        &self,
        identifier: &Identifier,
        password_hash: &PasswordHash,
    ) -> Result<User, AuthError> {
        // Check and insert under one write lock
        let mut users = self.users.write().await;
        if users.contains_key(identifier) {
            return Err(AuthError::DuplicateIdentifier);
        }

        let user = User {
            id: Uuid::new_v4(),
            identifier: identifier.clone(),
            password_hash: password_hash.clone(),
            created_at: Utc::now(),
        };
        users.insert(identifier.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_identifier(&self, identifier: &Identifier) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(identifier).cloned())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
