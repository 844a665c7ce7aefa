// Session storage: Redis-backed with an in-memory fallback

use crate::api::SessionStore;
use crate::core::errors::AuthError;
use crate::core::models::{SessionData, SessionId};
use async_trait::async_trait;
use moka::future::Cache;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::time::Duration;

fn session_key(session_id: &SessionId) -> String {
    format!("session:{}", session_id)
}

/// Redis store for session state
///
/// Each session is one JSON string under `session:{id}` with a TTL, so expiry is
/// handled by Redis itself.
pub struct RedisSessionStore {
    connection_manager: ConnectionManager,
    ttl_secs: u64,
}

impl RedisSessionStore {
    /// Create a new RedisSessionStore with connection manager
    ///
    /// Retries with linear backoff (3 attempts) and verifies the connection with PING.
    pub async fn new(redis_url: &str, ttl_secs: u64) -> Result<Self, AuthError> {
        use tokio::time::sleep;

        const MAX_RETRIES: u32 = 3;
        const INITIAL_DELAY_MS: u64 = 500;

        let mut connection_errors = Vec::new();

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                sleep(Duration::from_millis(INITIAL_DELAY_MS * attempt as u64)).await;
            }

            match Self::try_create_connection(redis_url, ttl_secs).await {
                Ok(store) => match store.ping().await {
                    Ok(_) => {
                        if attempt > 0 {
                            tracing::info!("Redis connection succeeded on attempt {}", attempt + 1);
                        }
                        return Ok(store);
                    }
                    Err(e) => {
                        connection_errors.push(format!("Connection created but ping failed: {}", e));
                    }
                },
                Err(e) => {
                    if attempt < MAX_RETRIES - 1 {
                        tracing::warn!(
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            error = %e,
                            "Redis connection attempt failed, retrying..."
                        );
                    }
                    connection_errors.push(format!("Attempt {} failed: {}", attempt + 1, e));
                }
            }
        }

        Err(AuthError::SessionError(format!(
            "Failed to create Redis connection after {} attempts. Errors: {}",
            MAX_RETRIES,
            connection_errors.join("; ")
        )))
    }

    async fn try_create_connection(redis_url: &str, ttl_secs: u64) -> Result<Self, AuthError> {
        let client = Client::open(redis_url).map_err(|e| {
            AuthError::SessionError(format!("Invalid Redis URL format: {}", e))
        })?;

        let connection_manager = tokio::time::timeout(Duration::from_secs(10), ConnectionManager::new(client))
            .await
            .map_err(|_| {
                AuthError::SessionError("Redis ConnectionManager creation timed out after 10 seconds".to_string())
            })?
            .map_err(|e| AuthError::SessionError(format!("Failed to create Redis ConnectionManager: {}", e)))?;

        Ok(Self {
            connection_manager,
            ttl_secs,
        })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionData>, AuthError> {
        let mut conn = self.connection_manager.clone();

        let raw: Option<String> = conn
            .get(session_key(session_id))
            .await
            .map_err(|e| AuthError::SessionError(format!("Failed to load session: {}", e)))?;

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| AuthError::SessionError(format!("Failed to deserialize session: {}", e)))
        })
        .transpose()
    }

    async fn save(&self, session_id: &SessionId, data: &SessionData) -> Result<(), AuthError> {
        let mut conn = self.connection_manager.clone();

        let json = serde_json::to_string(data)
            .map_err(|e| AuthError::SessionError(format!("Failed to serialize session: {}", e)))?;

        conn.set_ex::<_, _, ()>(session_key(session_id), json, self.ttl_secs)
            .await
            .map_err(|e| AuthError::SessionError(format!("Failed to save session: {}", e)))?;

        Ok(())
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<(), AuthError> {
        let mut conn = self.connection_manager.clone();

        conn.del::<_, ()>(session_key(session_id))
            .await
            .map_err(|e| AuthError::SessionError(format!("Failed to destroy session: {}", e)))?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        let mut conn = self.connection_manager.clone();
        let result: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| AuthError::SessionError(format!("Redis ping failed: {}", e)))?;

        if result == "PONG" {
            Ok(())
        } else {
            Err(AuthError::SessionError(format!(
                "Redis ping returned unexpected response: {}",
                result
            )))
        }
    }
}

/// Moka-based in-process session store with TTL expiration
///
/// Sessions do not survive a restart and are not shared between instances.
pub struct MemorySessionStore {
    cache: Cache<SessionId, SessionData>,
}

impl MemorySessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs))
            .max_capacity(100_000)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<SessionData>, AuthError> {
        Ok(self.cache.get(session_id).await)
    }

    async fn save(&self, session_id: &SessionId, data: &SessionData) -> Result<(), AuthError> {
        self.cache.insert(*session_id, data.clone()).await;
        Ok(())
    }

    async fn destroy(&self, session_id: &SessionId) -> Result<(), AuthError> {
        self.cache.invalidate(session_id).await;
        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        Ok(())
    }
}
