// SPDX-License-Identifier: MIT

//! Session state for the drafting workflow
//!
//! A fixed-schema record threads through every step. Steps never mutate
//! it directly; they return a [`StatePatch`] that the engine merges by
//! field replacement, with history appended.

use crate::services::generator::Message;
use serde::{Deserialize, Serialize};

/// The single mutable record for one drafting session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftState {
    /// Derived once from the opening topic, then fixed
    pub title: String,
    /// Organized findings, fixed once outline work begins
    pub research_notes: String,
    /// Overwritten by each revision pass
    pub outline: String,
    /// Set only after the outline is approved
    pub content: String,
    /// Latest gate decision; reset to false by each revision
    pub approved: bool,
    /// Reviewer feedback; cleared once a revision consumes it
    pub feedback: String,
    /// Append-only log of exchanges with the external services
    pub history: Vec<Message>,
}

impl DraftState {
    /// Seed a fresh session from the caller's topic.
    pub fn from_topic(topic: &str) -> Self {
        Self {
            history: vec![Message::user(format!("Write an article about {topic}"))],
            ..Self::default()
        }
    }

    /// Merge a step's partial update into this record.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(notes) = patch.research_notes {
            self.research_notes = notes;
        }
        if let Some(outline) = patch.outline {
            self.outline = outline;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(approved) = patch.approved {
            self.approved = approved;
        }
        if let Some(feedback) = patch.feedback {
            self.feedback = feedback;
        }
        self.history.extend(patch.messages);
    }

    /// The most recent history entry, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }
}

/// Partial update produced by one step.
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub title: Option<String>,
    pub research_notes: Option<String>,
    pub outline: Option<String>,
    pub content: Option<String>,
    pub approved: Option<bool>,
    pub feedback: Option<String>,
    /// Appended to history, never replacing it
    pub messages: Vec<Message>,
}

impl StatePatch {
    pub fn message(msg: Message) -> Self {
        Self {
            messages: vec![msg],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generator::Role;

    #[test]
    fn test_from_topic_seeds_history() {
        let state = DraftState::from_topic("electric vehicles");
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].role, Role::User);
        assert!(state.history[0].text.contains("electric vehicles"));
        assert!(state.title.is_empty());
        assert!(!state.approved);
    }

    #[test]
    fn test_apply_replaces_scalars() {
        let mut state = DraftState::default();
        state.apply(StatePatch {
            title: Some("EVs".to_string()),
            ..StatePatch::default()
        });
        state.apply(StatePatch {
            outline: Some("1. Intro".to_string()),
            approved: Some(true),
            ..StatePatch::default()
        });

        assert_eq!(state.title, "EVs");
        assert_eq!(state.outline, "1. Intro");
        assert!(state.approved);
    }

    #[test]
    fn test_apply_preserves_untouched_fields() {
        let mut state = DraftState::default();
        state.title = "EVs".to_string();
        state.research_notes = "- sales up".to_string();

        state.apply(StatePatch {
            outline: Some("revised".to_string()),
            approved: Some(false),
            feedback: Some(String::new()),
            ..StatePatch::default()
        });

        assert_eq!(state.title, "EVs");
        assert_eq!(state.research_notes, "- sales up");
        assert_eq!(state.outline, "revised");
    }

    #[test]
    fn test_apply_appends_history() {
        let mut state = DraftState::from_topic("rust");
        state.apply(StatePatch::message(Message::assistant("searching")));
        state.apply(StatePatch::message(Message::tool("3 results")));

        assert_eq!(state.history.len(), 3);
        assert_eq!(state.last_message().unwrap().text, "3 results");
    }

    #[test]
    fn test_state_serde_roundtrip() {
        let mut state = DraftState::from_topic("rust");
        state.title = "Rust in 2026".to_string();
        state.approved = true;

        let json = serde_json::to_string(&state).unwrap();
        let back: DraftState = serde_json::from_str(&json).unwrap();

        assert_eq!(back.title, "Rust in 2026");
        assert!(back.approved);
        assert_eq!(back.history.len(), 1);
    }
}
