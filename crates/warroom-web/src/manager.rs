//! Session manager: concurrent sessions behind one registry.
//!
//! Each session is an independent `warroom_core::Session`; the manager only
//! maps ids to instances. Nothing here touches scheduler state.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use warroom_core::{Session, SessionConfig, SessionId, TranscriptError};

/// Registry of live sessions.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Session>>>,
    default_config: SessionConfig,
}

impl SessionManager {
    /// Creates a manager that applies `default_config` to sessions created
    /// without an explicit config.
    pub fn new(default_config: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            default_config,
        }
    }

    /// Creates and registers a new session.
    pub fn create(&self, config: Option<SessionConfig>) -> Result<Session, TranscriptError> {
        let session = Session::new(config.unwrap_or_else(|| self.default_config.clone()))?;
        let mut sessions = self.sessions.write().expect("session registry poisoned");
        sessions.insert(session.id(), session.clone());
        tracing::info!(session = %session.id(), "Session created");
        Ok(session)
    }

    /// Looks up a session by id.
    pub fn get(&self, id: SessionId) -> Option<Session> {
        self.sessions
            .read()
            .expect("session registry poisoned")
            .get(&id)
            .cloned()
    }

    /// All live sessions, newest first.
    pub fn list(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .expect("session registry poisoned")
            .values()
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        sessions
    }

    /// Removes a session from the registry. Returns true if it existed.
    /// Observers holding clones keep working until they drop them.
    pub fn close(&self, id: SessionId) -> bool {
        let removed = self
            .sessions
            .write()
            .expect("session registry poisoned")
            .remove(&id)
            .is_some();
        if removed {
            tracing::info!(session = %id, "Session closed");
        }
        removed
    }

    /// Sweeps expired questions in every live session.
    pub fn expire_stale(&self) {
        for session in self.list() {
            session.expire_stale();
        }
    }
}
