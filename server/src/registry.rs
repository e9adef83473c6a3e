//! Process-wide directory of live game sessions
//!
//! Lookups and inserts go through one `RwLock`, so two connections racing
//! to create the same session always end up sharing one instance. Entries
//! live for the rest of the process.

use crate::archive::Archive;
use crate::dispatcher::Dispatcher;
use crate::error::SessionError;
use crate::player::SessionId;
use crate::session::{GameSession, SessionOptions, SharedSession};
use crate::utils::get_timestamp;
use log::{debug, error, info};
use shared::{MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A session together with its dispatcher
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub session: SharedSession,
    pub dispatcher: Dispatcher,
}

#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session named `id`, creating it with `options` if it does
    /// not exist yet. Options are ignored for an existing session.
    pub async fn get_or_create(
        &self,
        id: &str,
        options: &SessionOptions,
    ) -> Result<SessionEntry, SessionError> {
        let mut sessions = self.sessions.write().await;

        if let Some(entry) = sessions.get(id) {
            debug!("Session {} already exists", id);
            return Ok(entry.clone());
        }

        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&options.board_size) {
            return Err(SessionError::BoardSize(options.board_size));
        }

        let session = GameSession::new(id, options).shared();
        let dispatcher = Dispatcher::spawn(id, session.clone());
        let entry = SessionEntry {
            session,
            dispatcher,
        };
        sessions.insert(id.to_string(), entry.clone());

        info!("Registered session {} ({} live)", id, sessions.len());
        Ok(entry)
    }

    pub async fn lookup(&self, id: &str) -> Result<SessionEntry, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Sorted ids of all live sessions
    pub async fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Writes every session that has at least one move to `archive`.
    /// Failures are logged and skipped. Returns the number archived.
    pub async fn archive_all(&self, archive: &dyn Archive) -> usize {
        let entries: Vec<(SessionId, SessionEntry)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect();

        let ended_at = get_timestamp();
        let mut archived = 0;

        for (id, entry) in entries {
            let (summary, moves) = {
                let session = entry.session.read().await;
                if session.move_count() == 0 {
                    continue;
                }
                (session.summary(ended_at), session.history())
            };

            match archive.record(&summary, &moves) {
                Ok(()) => {
                    info!("Archived session {} ({} moves)", id, moves.len());
                    archived += 1;
                }
                Err(e) => error!("Failed to archive session {}: {}", id, e),
            }
        }

        archived
    }
}
