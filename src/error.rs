// SPDX-License-Identifier: MIT

//! Typed error handling for draftgate
//!
//! Every failure the engine can surface is classified into one of the
//! kinds below; nothing propagates as an opaque boxed error.

use thiserror::Error;

/// Text generation service failures.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// API errors reported by the generation provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Configuration errors (missing env vars, invalid base URL)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Malformed response body
    #[error("Invalid response from generator: {0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Web search service failures.
#[derive(Debug, Error)]
pub enum SearchError {
    /// API errors reported by the search provider
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Configuration errors (missing env vars)
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Malformed response body
    #[error("Invalid response from search provider: {0}")]
    InvalidResponse(String),
}

impl SearchError {
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

/// Tool invocation failures. Non-fatal at the workflow level: the
/// tool step records these into the message history and execution
/// continues with partial research.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool not found during execution
    #[error("Tool '{name}' not found")]
    NotFound { name: String },

    /// Arguments did not match the tool schema
    #[error("Invalid tool arguments: {0}")]
    InvalidArgs(#[from] serde_json::Error),

    /// Underlying search failure
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ToolError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}

/// Checkpoint store failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// I/O errors from a durable store
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Checkpoint (de)serialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A save whose base sequence number does not match the store's
    /// current latest. Signals a concurrent writer on the session.
    #[error("Checkpoint conflict for session {session_id}: latest is {latest}, attempted {attempted}")]
    Conflict {
        session_id: String,
        latest: u64,
        attempted: u64,
    },

    /// Stored checkpoint could not be interpreted
    #[error("Corrupt checkpoint for session {session_id}: {message}")]
    Corrupt { session_id: String, message: String },
}

/// Failure of a single workflow step. Tool failures never appear here:
/// the tool step folds them into the history instead.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Top-level engine error, surfaced by `start`/`resume`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Text generation step failed; last checkpoint remains intact
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Search adapter failed outside the tool step
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    /// No checkpoint exists for the session, or it already completed
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Another execution is in flight for the session
    #[error("Session busy: {0}")]
    SessionBusy(String),

    /// Checkpoint store unavailable or rejected a write
    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),
}

impl From<StepError> for EngineError {
    fn from(err: StepError) -> Self {
        match err {
            StepError::Generation(e) => Self::Generation(e),
            StepError::Search(e) => Self::Search(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::api("groq", "rate limited");
        assert_eq!(err.to_string(), "API error from groq: rate limited");
    }

    #[test]
    fn test_conflict_display() {
        let err = PersistenceError::Conflict {
            session_id: "s1".to_string(),
            latest: 3,
            attempted: 3,
        };
        assert!(err.to_string().contains("latest is 3"));
    }

    #[test]
    fn test_engine_error_from_generation() {
        let err: EngineError = GenerationError::config("GROQ_API_KEY must be set").into();
        assert!(matches!(err, EngineError::Generation(_)));
    }

    #[test]
    fn test_tool_error_from_search() {
        let err: ToolError = SearchError::api("tavily", "bad key").into();
        assert!(matches!(err, ToolError::Search(_)));
    }
}
