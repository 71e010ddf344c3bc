// SPDX-License-Identifier: MIT

//! draftgate — a checkpointed, human-in-the-loop workflow engine for
//! researched content drafting.
//!
//! The engine runs a fixed step graph (title, research, extraction,
//! outline) up to a human approval gate, suspends by returning to the
//! caller with a durable checkpoint, and resumes with the reviewer's
//! decision: rejections loop through revision, approval produces the
//! final draft.

pub mod error;
pub mod services;
pub mod workflow;
