// SPDX-License-Identifier: MIT

//! Step routing
//!
//! The workflow is a fixed finite-state machine: a transition table keyed
//! by the step that just completed, consulted by the engine after every
//! patch is applied. Two transitions are conditional: research routes
//! through the tool step only when the model asked for one, and the gate
//! routes on the reviewer's decision.

use crate::workflow::state::DraftState;
use serde::{Deserialize, Serialize};

/// Identifies one automated step in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    DeriveTitle,
    Research,
    InvokeTool,
    ExtractResearch,
    GenerateOutline,
    ReviseOutline,
    GenerateContent,
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StepId::DeriveTitle => "derive_title",
            StepId::Research => "research",
            StepId::InvokeTool => "invoke_tool",
            StepId::ExtractResearch => "extract_research",
            StepId::GenerateOutline => "generate_outline",
            StepId::ReviseOutline => "revise_outline",
            StepId::GenerateContent => "generate_content",
        };
        f.write_str(name)
    }
}

/// Where the engine stands in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Next automated step to execute
    Step(StepId),
    /// Suspended, awaiting the human decision
    Gate,
    /// Terminal: content generated
    Done,
}

/// Transition taken after `completed` ran and its patch was applied.
pub fn route(completed: StepId, state: &DraftState) -> Position {
    match completed {
        StepId::DeriveTitle => Position::Step(StepId::Research),
        StepId::Research => {
            let wants_tool = state
                .last_message()
                .is_some_and(|m| m.tool_call.is_some());
            if wants_tool {
                Position::Step(StepId::InvokeTool)
            } else {
                Position::Step(StepId::ExtractResearch)
            }
        }
        StepId::InvokeTool => Position::Step(StepId::ExtractResearch),
        StepId::ExtractResearch => Position::Step(StepId::GenerateOutline),
        StepId::GenerateOutline => Position::Gate,
        StepId::ReviseOutline => Position::Gate,
        StepId::GenerateContent => Position::Done,
    }
}

/// Transition taken after a gate decision has been injected.
pub fn route_gate(state: &DraftState) -> Position {
    if state.approved {
        Position::Step(StepId::GenerateContent)
    } else {
        Position::Step(StepId::ReviseOutline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::generator::{Message, Role, ToolCall};
    use serde_json::json;

    fn state_with_last(msg: Message) -> DraftState {
        let mut state = DraftState::default();
        state.history.push(msg);
        state
    }

    #[test]
    fn test_linear_transitions() {
        let state = DraftState::default();
        assert_eq!(
            route(StepId::DeriveTitle, &state),
            Position::Step(StepId::Research)
        );
        assert_eq!(
            route(StepId::InvokeTool, &state),
            Position::Step(StepId::ExtractResearch)
        );
        assert_eq!(
            route(StepId::ExtractResearch, &state),
            Position::Step(StepId::GenerateOutline)
        );
        assert_eq!(route(StepId::GenerateOutline, &state), Position::Gate);
        assert_eq!(route(StepId::ReviseOutline, &state), Position::Gate);
        assert_eq!(route(StepId::GenerateContent, &state), Position::Done);
    }

    #[test]
    fn test_research_routes_to_tool_on_request() {
        let state = state_with_last(Message {
            role: Role::Assistant,
            text: String::new(),
            tool_call: Some(ToolCall {
                name: "web_search".to_string(),
                args: json!({"query": "ev news"}),
            }),
        });

        assert_eq!(
            route(StepId::Research, &state),
            Position::Step(StepId::InvokeTool)
        );
    }

    #[test]
    fn test_research_skips_tool_without_request() {
        let state = state_with_last(Message::assistant("here is what I know"));
        assert_eq!(
            route(StepId::Research, &state),
            Position::Step(StepId::ExtractResearch)
        );
    }

    #[test]
    fn test_gate_routes_on_decision() {
        let mut state = DraftState::default();
        state.approved = false;
        assert_eq!(route_gate(&state), Position::Step(StepId::ReviseOutline));

        state.approved = true;
        assert_eq!(route_gate(&state), Position::Step(StepId::GenerateContent));
    }

    #[test]
    fn test_position_serde() {
        let pos = Position::Step(StepId::GenerateOutline);
        let json = serde_json::to_string(&pos).unwrap();
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pos);

        let gate: Position = serde_json::from_str("\"gate\"").unwrap();
        assert_eq!(gate, Position::Gate);
    }
}
