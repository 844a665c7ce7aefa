// Per-request session context

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::core::models::{SessionData, SessionId, SessionUser};

/// What happened to the session while the request was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    Unchanged,
    /// A user was written; the session must be saved under a fresh id
    Established,
    /// The whole session must be removed from the store
    Destroyed,
}

/// Explicit session context handed to the authentication service.
///
/// `set_user` and `destroy` are the only mutations. The session middleware reads
/// `transition()` after the handler returns and persists the result.
#[derive(Debug, Clone)]
pub struct Session {
    id: Option<SessionId>,
    data: SessionData,
    transition: SessionTransition,
}

impl Session {
    /// Fresh, unauthenticated session with no backing store entry
    pub fn new() -> Self {
        Self {
            id: None,
            data: SessionData::default(),
            transition: SessionTransition::Unchanged,
        }
    }

    /// Session restored from the store
    pub fn loaded(id: SessionId, data: SessionData) -> Self {
        Self {
            id: Some(id),
            data,
            transition: SessionTransition::Unchanged,
        }
    }

    pub fn id(&self) -> Option<SessionId> {
        self.id
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.data.user.as_ref()
    }

    pub fn set_user(&mut self, user: SessionUser) {
        self.data.user = Some(user);
        self.transition = SessionTransition::Established;
    }

    /// Clear everything, not just the user field
    pub fn destroy(&mut self) {
        self.data = SessionData::default();
        self.transition = SessionTransition::Destroyed;
    }

    pub fn transition(&self) -> SessionTransition {
        self.transition
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle placed in request extensions by the session middleware
#[derive(Debug, Clone)]
pub struct SessionHandle(Arc<Mutex<Session>>);

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.0.lock().await
    }

    /// Copy of the current session state
    pub async fn snapshot(&self) -> Session {
        self.0.lock().await.clone()
    }
}
