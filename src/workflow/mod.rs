// SPDX-License-Identifier: MIT

//! The drafting workflow: state record, step implementations, routing
//! table, checkpoint persistence, and the engine that drives them.

pub mod checkpoint;
pub mod engine;
pub mod routing;
pub mod state;
pub mod steps;

pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use engine::{Decision, Engine, ExecutionResult, ExecutionStatus, ReviewRequest};
pub use routing::{Position, StepId};
pub use state::{DraftState, StatePatch};
