//! Registry of mirrored sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::facade::{FrontendSession, Project, SessionOptions, SessionServices};
use super::SessionId;
use crate::error::MirrorError;
use crate::remote::SessionDto;
use crate::scope::Scope;
use crate::Result;

/// Thread-safe map from session ID to its facade.
///
/// Guarantees one facade per session and closes each facade exactly once,
/// when it leaves the registry.
pub struct SessionRegistry {
    project: Project,
    scope: Scope,
    services: SessionServices,
    options: SessionOptions,
    sessions: RwLock<HashMap<SessionId, Arc<FrontendSession>>>,
}

impl SessionRegistry {
    /// Create an empty registry whose sessions live under a child of `parent`.
    pub fn new(
        project: Project,
        parent: &Scope,
        services: SessionServices,
        options: SessionOptions,
    ) -> Self {
        Self {
            scope: parent.child(format!("debugger {}", project.name())),
            project,
            services,
            options,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start mirroring a session announced by the backend.
    pub fn open(&self, dto: SessionDto) -> Result<Arc<FrontendSession>> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|_| MirrorError::LockPoisoned)?;

        if sessions.contains_key(&dto.id) {
            return Err(MirrorError::SessionExists(dto.id.to_string()));
        }

        let id = dto.id;
        let session = Arc::new(FrontendSession::open(
            self.project.clone(),
            &self.scope,
            dto,
            self.services.clone(),
            self.options.clone(),
        ));
        sessions.insert(id, session.clone());
        Ok(session)
    }

    /// Get the facade for a session.
    pub fn get(&self, id: &SessionId) -> Result<Option<Arc<FrontendSession>>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| MirrorError::LockPoisoned)?;
        Ok(sessions.get(id).cloned())
    }

    /// Check if a session is mirrored.
    pub fn contains(&self, id: &SessionId) -> Result<bool> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| MirrorError::LockPoisoned)?;
        Ok(sessions.contains_key(id))
    }

    /// Remove a session and close its scope.
    ///
    /// Returns the closed facade, or None if it wasn't registered.
    pub fn close(&self, id: &SessionId) -> Result<Option<Arc<FrontendSession>>> {
        let removed = {
            let mut sessions = self
                .sessions
                .write()
                .map_err(|_| MirrorError::LockPoisoned)?;
            sessions.remove(id)
        };
        if let Some(session) = &removed {
            debug!(session = %id, "removed from registry");
            session.close_scope();
        }
        Ok(removed)
    }

    /// Remove a session and wait for its shutdown to complete.
    pub async fn shutdown(&self, id: &SessionId) -> Result<()> {
        let session = self
            .close(id)?
            .ok_or_else(|| MirrorError::SessionNotFound(id.to_string()))?;
        session.shutdown().await
    }

    /// Get the number of mirrored sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// List all mirrored session IDs.
    pub fn list_ids(&self) -> Result<Vec<SessionId>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| MirrorError::LockPoisoned)?;
        Ok(sessions.keys().copied().collect())
    }

    /// Close every session matching a predicate, e.g. stopped ones.
    ///
    /// Returns the number of sessions closed.
    pub fn close_matching<F>(&self, predicate: F) -> Result<usize>
    where
        F: Fn(&FrontendSession) -> bool,
    {
        let removed: Vec<_> = {
            let mut sessions = self
                .sessions
                .write()
                .map_err(|_| MirrorError::LockPoisoned)?;
            let ids: Vec<_> = sessions
                .iter()
                .filter(|(_, session)| predicate(session))
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &removed {
            session.close_scope();
        }
        Ok(removed.len())
    }

    /// Close all sessions.
    pub fn close_all(&self) -> Result<usize> {
        self.close_matching(|_| true)
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}
