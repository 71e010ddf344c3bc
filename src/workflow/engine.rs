// SPDX-License-Identifier: MIT

//! Workflow engine
//!
//! Drives one session's steps in routing order on a single logical thread
//! of control. Suspension at the human gate is a true return to the
//! caller: nothing blocks while the reviewer thinks, and the process may
//! restart entirely between `start` and `resume` because continuity rests
//! on the checkpoint store alone.

use crate::error::EngineError;
use crate::services::generator::{Message, TextGenerator};
use crate::services::search::SearchProvider;
use crate::services::tool::{Tool, WebSearchTool};
use crate::workflow::checkpoint::{Checkpoint, CheckpointStore};
use crate::workflow::routing::{self, Position, StepId};
use crate::workflow::state::{DraftState, StatePatch};
use crate::workflow::steps::{
    DeriveTitle, ExtractResearch, GenerateContent, GenerateOutline, InvokeTool, Research,
    ReviseOutline, Step,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// The human's verdict on the outline under review.
#[derive(Debug, Clone)]
pub struct Decision {
    pub approved: bool,
    /// Ignored downstream when `approved` is true
    pub feedback: String,
}

/// Read-only projection handed to the caller while suspended.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub title: String,
    pub outline: String,
    pub research_notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Parked at the human gate; call `resume` with a decision
    Suspended,
    /// Terminal step completed
    Completed,
}

/// Outcome of a `start`/`resume` call. Failures surface as
/// [`EngineError`] instead, always leaving the last checkpoint intact.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub session_id: String,
    pub status: ExecutionStatus,
    pub state: DraftState,
    /// Present iff suspended
    pub review: Option<ReviewRequest>,
}

impl ExecutionResult {
    fn suspended(checkpoint: Checkpoint) -> Self {
        let review = ReviewRequest {
            title: checkpoint.state.title.clone(),
            outline: checkpoint.state.outline.clone(),
            research_notes: checkpoint.state.research_notes.clone(),
        };
        Self {
            session_id: checkpoint.session_id,
            status: ExecutionStatus::Suspended,
            state: checkpoint.state,
            review: Some(review),
        }
    }

    fn completed(checkpoint: Checkpoint) -> Self {
        Self {
            session_id: checkpoint.session_id,
            status: ExecutionStatus::Completed,
            state: checkpoint.state,
            review: None,
        }
    }
}

/// In-process per-session mutual exclusion. A second `start`/`resume`
/// on an in-flight session fails fast instead of racing on the store;
/// the store's sequence check covers writers in other processes.
#[derive(Clone, Default)]
struct SessionLocks {
    active: Arc<Mutex<HashSet<String>>>,
}

impl SessionLocks {
    fn acquire(&self, session_id: &str) -> Result<SessionGuard, EngineError> {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !active.insert(session_id.to_string()) {
            return Err(EngineError::SessionBusy(session_id.to_string()));
        }
        Ok(SessionGuard {
            session_id: session_id.to_string(),
            active: self.active.clone(),
        })
    }
}

/// Releases the session slot on drop, error paths included.
#[derive(Debug)]
struct SessionGuard {
    session_id: String,
    active: Arc<Mutex<HashSet<String>>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        active.remove(&self.session_id);
    }
}

pub struct Engine {
    steps: HashMap<StepId, Arc<dyn Step>>,
    store: Arc<dyn CheckpointStore>,
    locks: SessionLocks,
}

impl Engine {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        search: Arc<dyn SearchProvider>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(WebSearchTool::new(search))];

        let steps: Vec<Arc<dyn Step>> = vec![
            Arc::new(DeriveTitle {
                generator: generator.clone(),
            }),
            Arc::new(Research {
                generator: generator.clone(),
                tools: tools.clone(),
            }),
            Arc::new(InvokeTool { tools }),
            Arc::new(ExtractResearch {
                generator: generator.clone(),
            }),
            Arc::new(GenerateOutline {
                generator: generator.clone(),
            }),
            Arc::new(ReviseOutline {
                generator: generator.clone(),
            }),
            Arc::new(GenerateContent { generator }),
        ];

        Self {
            steps: steps.into_iter().map(|s| (s.id(), s)).collect(),
            store,
            locks: SessionLocks::default(),
        }
    }

    /// Begin a new session for `topic` and run until the gate suspends.
    ///
    /// A missing `session_id` gets a generated one, returned in the
    /// result.
    pub async fn start(
        &self,
        session_id: Option<String>,
        topic: &str,
    ) -> Result<ExecutionResult, EngineError> {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let _guard = self.locks.acquire(&session_id)?;

        log::info!("Starting session {} for topic '{}'", session_id, topic);

        let state = DraftState::from_topic(topic);
        let checkpoint =
            Checkpoint::initial(session_id, Position::Step(StepId::DeriveTitle), state);
        self.store.save(&checkpoint).await?;

        self.advance(checkpoint).await
    }

    /// Continue a suspended session with the reviewer's decision.
    ///
    /// Fails with `SessionNotFound` when no checkpoint exists or the
    /// session already completed. A latest checkpoint that is neither
    /// terminal nor gate-pending was left by a failed call; it resumes
    /// from that position without re-injecting the decision, which makes
    /// retrying the failed call idempotent.
    pub async fn resume(
        &self,
        session_id: &str,
        decision: Decision,
    ) -> Result<ExecutionResult, EngineError> {
        let _guard = self.locks.acquire(session_id)?;

        let latest = self
            .store
            .load_latest(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        if latest.is_terminal() {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        }

        let checkpoint = if latest.pending_gate {
            log::info!(
                "Session {}: gate decision approved={}",
                session_id,
                decision.approved
            );

            let mut state = latest.state.clone();
            state.apply(StatePatch {
                approved: Some(decision.approved),
                feedback: Some(decision.feedback),
                messages: vec![Message::user(format!(
                    "Human review completed. Approved: {}",
                    decision.approved
                ))],
                ..StatePatch::default()
            });

            let position = routing::route_gate(&state);
            let next = latest.advance(position, state);
            self.store.save(&next).await?;
            next
        } else {
            log::info!(
                "Session {}: resuming mid-flight from checkpoint {}",
                session_id,
                latest.seq
            );
            latest
        };

        self.advance(checkpoint).await
    }

    /// Run steps from the checkpoint's position until the workflow
    /// suspends or completes, checkpointing after every step.
    async fn advance(&self, mut checkpoint: Checkpoint) -> Result<ExecutionResult, EngineError> {
        loop {
            let id = match checkpoint.position {
                Position::Done => {
                    log::info!("Session {} completed", checkpoint.session_id);
                    return Ok(ExecutionResult::completed(checkpoint));
                }
                Position::Gate => {
                    log::info!(
                        "Session {} suspended for review at checkpoint {}",
                        checkpoint.session_id,
                        checkpoint.seq
                    );
                    return Ok(ExecutionResult::suspended(checkpoint));
                }
                Position::Step(id) => id,
            };

            log::info!("Session {}: executing {}", checkpoint.session_id, id);
            let patch = self.steps[&id].run(&checkpoint.state).await?;

            let mut state = checkpoint.state.clone();
            state.apply(patch);

            let position = routing::route(id, &state);
            let next = checkpoint.advance(position, state);
            self.store.save(&next).await?;
            checkpoint = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_locks_exclusive() {
        let locks = SessionLocks::default();

        let guard = locks.acquire("s1").unwrap();
        let err = locks.acquire("s1").unwrap_err();
        assert!(matches!(err, EngineError::SessionBusy(_)));

        // Independent sessions are unaffected
        let _other = locks.acquire("s2").unwrap();

        drop(guard);
        assert!(locks.acquire("s1").is_ok());
    }

    #[test]
    fn test_review_projection() {
        let mut state = DraftState::default();
        state.title = "EVs".to_string();
        state.outline = "1. Intro".to_string();
        state.research_notes = "- sales up".to_string();

        let checkpoint = Checkpoint::initial("s1".to_string(), Position::Gate, state);
        let result = ExecutionResult::suspended(checkpoint);

        assert_eq!(result.status, ExecutionStatus::Suspended);
        let review = result.review.unwrap();
        assert_eq!(review.title, "EVs");
        assert_eq!(review.outline, "1. Intro");
        assert_eq!(review.research_notes, "- sales up");
    }
}
