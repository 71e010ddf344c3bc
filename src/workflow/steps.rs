// SPDX-License-Identifier: MIT

//! Workflow step implementations
//!
//! Each step reads the current [`DraftState`] and returns a [`StatePatch`];
//! the only side effects are the adapter calls. A patch is committed by the
//! engine only after the external call succeeds, which keeps retries safe.

use crate::error::StepError;
use crate::services::generator::{Message, Role, TextGenerator};
use crate::services::tool::{find_tool, Tool};
use crate::workflow::routing::StepId;
use crate::workflow::state::{DraftState, StatePatch};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Step: Send + Sync {
    fn id(&self) -> StepId;
    async fn run(&self, state: &DraftState) -> Result<StatePatch, StepError>;
}

/// Extracts the working title from the opening user message.
pub struct DeriveTitle {
    pub generator: Arc<dyn TextGenerator>,
}

#[async_trait]
impl Step for DeriveTitle {
    fn id(&self) -> StepId {
        StepId::DeriveTitle
    }

    async fn run(&self, state: &DraftState) -> Result<StatePatch, StepError> {
        let request = state
            .history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text.as_str())
            .unwrap_or_default();

        let prompt = format!(
            "Given the user input: \"{request}\", extract the article title or topic. \
             Return only the topic and nothing else."
        );

        let title = self.generator.generate(&prompt).await?;
        Ok(StatePatch {
            title: Some(title.trim().to_string()),
            ..StatePatch::default()
        })
    }
}

/// Asks the generator to research the title with the search tool bound.
/// The response may carry a tool-call request, which routing sends to
/// [`InvokeTool`].
pub struct Research {
    pub generator: Arc<dyn TextGenerator>,
    pub tools: Vec<Arc<dyn Tool>>,
}

#[async_trait]
impl Step for Research {
    fn id(&self) -> StepId {
        StepId::Research
    }

    async fn run(&self, state: &DraftState) -> Result<StatePatch, StepError> {
        let prompt = format!(
            "Use the web_search tool to find the latest developments, news, and \
             statistics about: \"{}\". Search the web and return your findings.",
            state.title
        );

        let message = self.generator.generate_with_tools(&prompt, &self.tools).await?;
        Ok(StatePatch::message(message))
    }
}

/// Executes the tool call requested by the research step. Failures are
/// folded into the history as a note so extraction can proceed with
/// partial research; this step never fails the workflow.
pub struct InvokeTool {
    pub tools: Vec<Arc<dyn Tool>>,
}

#[async_trait]
impl Step for InvokeTool {
    fn id(&self) -> StepId {
        StepId::InvokeTool
    }

    async fn run(&self, state: &DraftState) -> Result<StatePatch, StepError> {
        let Some(call) = state.last_message().and_then(|m| m.tool_call.clone()) else {
            log::warn!("invoke_tool reached without a pending tool call");
            return Ok(StatePatch::default());
        };

        log::info!("Tool call: {} {}", call.name, call.args);

        let result = match find_tool(&self.tools, &call.name) {
            Ok(tool) => tool.execute(call.args.clone()).await,
            Err(e) => Err(e),
        };

        let message = match result {
            Ok(value) => {
                Message::tool(serde_json::to_string_pretty(&value).unwrap_or_default())
            }
            Err(e) => {
                log::warn!("Tool {} failed: {}", call.name, e);
                Message::tool(format!("Tool '{}' failed: {}", call.name, e))
            }
        };

        Ok(StatePatch::message(message))
    }
}

/// Organizes everything gathered so far into research notes.
pub struct ExtractResearch {
    pub generator: Arc<dyn TextGenerator>,
}

impl ExtractResearch {
    /// Gather text and tool-call queries from the history into one corpus.
    fn collect_corpus(state: &DraftState) -> String {
        let mut parts = Vec::new();
        for msg in &state.history {
            if !msg.text.is_empty() {
                parts.push(msg.text.clone());
            }
            if let Some(call) = &msg.tool_call {
                parts.push(format!("Search query: {}", call.args));
            }
        }
        parts.join("\n")
    }
}

#[async_trait]
impl Step for ExtractResearch {
    fn id(&self) -> StepId {
        StepId::ExtractResearch
    }

    async fn run(&self, state: &DraftState) -> Result<StatePatch, StepError> {
        let corpus = Self::collect_corpus(state);

        let prompt = format!(
            "From the following research data about \"{}\", extract and organize \
             the key information into clear bullet points covering key facts and \
             statistics, recent developments, important findings, and market data \
             if applicable.\n\nResearch Data:\n{corpus}\n\n\
             Return only the organized research findings as bullet points.",
            state.title
        );

        let notes = self.generator.generate(&prompt).await?;
        let notes = if notes.trim().is_empty() {
            format!("Research completed for {}", state.title)
        } else {
            notes
        };

        Ok(StatePatch {
            research_notes: Some(notes),
            ..StatePatch::default()
        })
    }
}

/// Drafts the first outline from the title and research notes.
pub struct GenerateOutline {
    pub generator: Arc<dyn TextGenerator>,
}

#[async_trait]
impl Step for GenerateOutline {
    fn id(&self) -> StepId {
        StepId::GenerateOutline
    }

    async fn run(&self, state: &DraftState) -> Result<StatePatch, StepError> {
        let prompt = format!(
            "Based on the research notes below, generate a detailed outline for \
             the topic: \"{}\"\n\nResearch Notes:\n{}\n\n\
             Create a structured outline with an introduction, 3-5 main sections, \
             and a conclusion. Make it engaging and informative.",
            state.title, state.research_notes
        );

        let outline = self.generator.generate(&prompt).await?;
        Ok(StatePatch {
            outline: Some(outline.clone()),
            messages: vec![Message::assistant(outline)],
            ..StatePatch::default()
        })
    }
}

/// Reworks the outline to address reviewer feedback, then clears the
/// decision fields for the next gate pass.
pub struct ReviseOutline {
    pub generator: Arc<dyn TextGenerator>,
}

#[async_trait]
impl Step for ReviseOutline {
    fn id(&self) -> StepId {
        StepId::ReviseOutline
    }

    async fn run(&self, state: &DraftState) -> Result<StatePatch, StepError> {
        let feedback = if state.feedback.is_empty() {
            "Please improve the outline"
        } else {
            state.feedback.as_str()
        };

        let prompt = format!(
            "The current outline was not approved. Revise and improve it based \
             on this feedback:\n\nFEEDBACK: {feedback}\n\n\
             Current Title: {}\nCurrent Outline:\n{}\nResearch Notes:\n{}\n\n\
             Create a better outline that addresses the feedback, has clearer \
             structure, and better incorporates the research findings. Provide \
             the revised outline:",
            state.title, state.outline, state.research_notes
        );

        let outline = self.generator.generate(&prompt).await?;
        Ok(StatePatch {
            outline: Some(outline),
            approved: Some(false),
            feedback: Some(String::new()),
            messages: vec![Message::user("Outline revised based on feedback")],
            ..StatePatch::default()
        })
    }
}

/// Writes the full draft once the outline is approved. Terminal step.
pub struct GenerateContent {
    pub generator: Arc<dyn TextGenerator>,
}

#[async_trait]
impl Step for GenerateContent {
    fn id(&self) -> StepId {
        StepId::GenerateContent
    }

    async fn run(&self, state: &DraftState) -> Result<StatePatch, StepError> {
        let prompt = format!(
            "Write a comprehensive, well-structured article based on the \
             following information.\n\nTitle: {}\n\nResearch Notes:\n{}\n\n\
             Outline:\n{}\n\nFollow the outline, support your points with the \
             research findings, write in a professional yet accessible tone, \
             and end with a conclusion that summarizes the key points. Aim for \
             800-1200 words.",
            state.title, state.research_notes, state.outline
        );

        let content = self.generator.generate(&prompt).await?;
        Ok(StatePatch {
            content: Some(content.clone()),
            messages: vec![Message::assistant(content)],
            ..StatePatch::default()
        })
    }
}
