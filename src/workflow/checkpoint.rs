// SPDX-License-Identifier: MIT

//! Checkpoint persistence
//!
//! Every step commit and every suspension writes an immutable snapshot of
//! the session: its state, the engine's position, and a sequence number.
//! Resuming after an arbitrary pause only needs the latest snapshot, so a
//! process restart between calls loses nothing. Saves enforce an
//! optimistic sequence check: a write whose number is not exactly one past
//! the store's latest is rejected, which serializes concurrent writers.

use crate::error::PersistenceError;
use crate::workflow::routing::Position;
use crate::workflow::state::DraftState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable snapshot of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    pub seq: u64,
    pub position: Position,
    /// True iff the engine is parked at the human gate
    pub pending_gate: bool,
    pub state: DraftState,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Checkpoint 0 for a fresh session.
    pub fn initial(session_id: String, position: Position, state: DraftState) -> Self {
        Self {
            session_id,
            seq: 0,
            position,
            pending_gate: matches!(position, Position::Gate),
            state,
            created_at: Utc::now(),
        }
    }

    /// Successor snapshot at the next sequence number.
    pub fn advance(&self, position: Position, state: DraftState) -> Self {
        Self {
            session_id: self.session_id.clone(),
            seq: self.seq + 1,
            position,
            pending_gate: matches!(position, Position::Gate),
            state,
            created_at: Utc::now(),
        }
    }

    /// Terminal: the session completed and holds no pending gate.
    pub fn is_terminal(&self) -> bool {
        matches!(self.position, Position::Done)
    }
}

/// Keyed persistence for session checkpoints.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a checkpoint. Fails with [`PersistenceError::Conflict`]
    /// unless `seq` is exactly one past the stored latest (or 0 for a
    /// fresh session).
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError>;

    /// Load the most recent checkpoint for a session, if any.
    async fn load_latest(&self, session_id: &str)
        -> Result<Option<Checkpoint>, PersistenceError>;

    /// Drop a session and its whole checkpoint history.
    async fn delete_session(&self, session_id: &str) -> Result<(), PersistenceError>;
}

/// In-memory store. Suits tests and single-process callers that accept
/// losing suspended sessions on restart.
#[derive(Clone, Default)]
pub struct MemoryCheckpointStore {
    sessions: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of checkpoints recorded for a session.
    pub async fn history_len(&self, session_id: &str) -> usize {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).map_or(0, |v| v.len())
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let mut sessions = self.sessions.write().await;
        let history = sessions
            .entry(checkpoint.session_id.clone())
            .or_default();

        let expected = history.last().map_or(0, |c| c.seq + 1);
        if checkpoint.seq != expected {
            return Err(PersistenceError::Conflict {
                session_id: checkpoint.session_id.clone(),
                latest: history.last().map_or(0, |c| c.seq),
                attempted: checkpoint.seq,
            });
        }

        history.push(checkpoint.clone());
        Ok(())
    }

    async fn load_latest(
        &self,
        session_id: &str,
    ) -> Result<Option<Checkpoint>, PersistenceError> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .and_then(|history| history.last().cloned()))
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), PersistenceError> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id);
        Ok(())
    }
}

/// File-backed store: one JSON file per checkpoint under
/// `<root>/<session>/<seq>.json`. Durable across process restarts, which
/// is what lets a human take days to answer the gate.
pub struct FileCheckpointStore {
    root: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }

    fn checkpoint_path(&self, session_id: &str, seq: u64) -> PathBuf {
        self.session_dir(session_id).join(format!("{seq:010}.json"))
    }

    /// Highest sequence number on disk for a session, if any.
    async fn latest_seq(&self, session_id: &str) -> Result<Option<u64>, PersistenceError> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            return Ok(None);
        }

        let mut latest = None;
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(seq) = stem.parse::<u64>() {
                latest = Some(latest.map_or(seq, |l: u64| l.max(seq)));
            }
        }
        Ok(latest)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        let latest = self.latest_seq(&checkpoint.session_id).await?;
        let expected = latest.map_or(0, |l| l + 1);
        if checkpoint.seq != expected {
            return Err(PersistenceError::Conflict {
                session_id: checkpoint.session_id.clone(),
                latest: latest.unwrap_or(0),
                attempted: checkpoint.seq,
            });
        }

        let dir = self.session_dir(&checkpoint.session_id);
        tokio::fs::create_dir_all(&dir).await?;

        // Write to a temp name first so a crash never leaves a torn file
        // as the latest checkpoint.
        let path = self.checkpoint_path(&checkpoint.session_id, checkpoint.seq);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(checkpoint)?;
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(())
    }

    async fn load_latest(
        &self,
        session_id: &str,
    ) -> Result<Option<Checkpoint>, PersistenceError> {
        let Some(seq) = self.latest_seq(session_id).await? else {
            return Ok(None);
        };

        let path = self.checkpoint_path(session_id, seq);
        let body = tokio::fs::read(&path).await?;
        let checkpoint: Checkpoint =
            serde_json::from_slice(&body).map_err(|e| PersistenceError::Corrupt {
                session_id: session_id.to_string(),
                message: e.to_string(),
            })?;
        Ok(Some(checkpoint))
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), PersistenceError> {
        let dir = self.session_dir(session_id);
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        Ok(())
    }
}
