// SPDX-License-Identifier: MIT

//! Text generation adapter
//!
//! The workflow talks to its LLM through [`TextGenerator`]: plain prompt
//! in, text out, plus a tool-aware variant for the research step where the
//! model may answer with a search request instead of text.

use crate::error::GenerationError;
use crate::services::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;
use std::sync::Arc;

/// Who produced a message in the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// One exchange in the session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Present when the model asked for a tool instead of answering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            tool_call: None,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            tool_call: None,
        }
    }

    pub fn tool(text: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            text: text.into(),
            tool_call: None,
        }
    }
}

/// Narrow interface to the text generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate plain text from a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Generate with tools bound; the response may carry a tool-call
    /// request instead of (or alongside) text.
    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[Arc<dyn Tool>],
    ) -> Result<Message, GenerationError>;
}

/// Groq chat-completions generator (OpenAI-compatible API).
pub struct GroqGenerator {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GroqGenerator {
    /// Create a new GroqGenerator
    ///
    /// Requires `GROQ_API_KEY` environment variable to be set.
    /// Optionally uses `GROQ_BASE_URL` for custom endpoints.
    pub fn new(model_name: String) -> Result<Self, GenerationError> {
        let api_key = env::var("GROQ_API_KEY")
            .map_err(|_| GenerationError::config("GROQ_API_KEY must be set"))?;
        let base_url = env::var("GROQ_BASE_URL")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());

        Ok(Self {
            client: Client::new(),
            api_key,
            model_name,
            base_url,
        })
    }

    /// Convert tools to the OpenAI function format
    fn tools_to_wire_format(tools: &[Arc<dyn Tool>]) -> Vec<Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.schema()
                    }
                })
            })
            .collect()
    }

    /// Parse a chat-completions response into a Message
    fn parse_response(response: &Value) -> Result<Message, GenerationError> {
        let message = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .map(|choice| &choice["message"])
            .ok_or_else(|| {
                GenerationError::InvalidResponse("no choices in response".to_string())
            })?;

        let text = message["content"].as_str().unwrap_or_default().to_string();

        // Only the first tool call matters: the research step issues at
        // most one search per pass.
        let tool_call = message["tool_calls"]
            .as_array()
            .and_then(|calls| calls.first())
            .map(|tc| {
                let name = tc["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");
                let args: Value = serde_json::from_str(args_str).unwrap_or(json!({}));
                ToolCall { name, args }
            });

        Ok(Message {
            role: Role::Assistant,
            text,
            tool_call,
        })
    }

    async fn request(&self, body: Value) -> Result<Value, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);

        log::debug!(
            "Groq request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(GenerationError::api("groq", text));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl TextGenerator for GroqGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = json!({
            "model": self.model_name,
            "messages": [{ "role": "user", "content": prompt }]
        });

        let resp = self.request(body).await?;
        Ok(Self::parse_response(&resp)?.text)
    }

    async fn generate_with_tools(
        &self,
        prompt: &str,
        tools: &[Arc<dyn Tool>],
    ) -> Result<Message, GenerationError> {
        let mut body = json!({
            "model": self.model_name,
            "messages": [{ "role": "user", "content": prompt }]
        });

        if !tools.is_empty() {
            body["tools"] = json!(Self::tools_to_wire_format(tools));
            body["tool_choice"] = json!("auto");
        }

        let resp = self.request(body).await?;
        Self::parse_response(&resp)
    }
}
