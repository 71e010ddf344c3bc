// SPDX-License-Identifier: MIT

use crate::error::ToolError;
use crate::services::search::SearchProvider;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Trait for tools the generator can request mid-conversation.
///
/// `name()`, `description()` and `schema()` return references so the hot
/// path never allocates; implementations keep these in struct fields or
/// statics.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (must be unique within the bound tool set)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Execute the tool with the given input and return the result
    async fn execute(&self, input: Value) -> Result<Value, ToolError>;
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool").field("name", &self.name()).finish()
    }
}

static WEB_SEARCH_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": "The search query"
            },
            "max_results": {
                "type": "integer",
                "description": "Number of results to return (default 3, max 20)"
            }
        },
        "required": ["query"]
    })
});

#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    query: String,
    #[serde(default)]
    max_results: Option<u32>,
}

/// Web search exposed as a bindable tool.
pub struct WebSearchTool {
    provider: Arc<dyn SearchProvider>,
}

impl WebSearchTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web for current information. Returns relevant results with titles, URLs, and snippets."
    }

    fn schema(&self) -> &Value {
        &WEB_SEARCH_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, ToolError> {
        let args: WebSearchArgs = serde_json::from_value(input)?;
        let max_results = args.max_results.unwrap_or(3);

        let results = self.provider.search(&args.query, max_results).await?;

        Ok(json!({
            "query": args.query,
            "results": results,
        }))
    }
}

/// Find a tool by name within a bound tool set.
pub fn find_tool<'a>(tools: &'a [Arc<dyn Tool>], name: &str) -> Result<&'a Arc<dyn Tool>, ToolError> {
    tools
        .iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| ToolError::not_found(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;
    use crate::services::search::SearchResult;

    struct FixedSearch {
        results: Vec<SearchResult>,
    }

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(
            &self,
            _query: &str,
            _max_results: u32,
        ) -> Result<Vec<SearchResult>, SearchError> {
            Ok(self.results.clone())
        }
    }

    fn result(title: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            snippet: format!("snippet about {title}"),
        }
    }

    #[tokio::test]
    async fn test_web_search_tool_executes_provider() {
        let tool = WebSearchTool::new(Arc::new(FixedSearch {
            results: vec![result("ev"), result("battery")],
        }));

        let out = tool
            .execute(json!({ "query": "electric vehicles" }))
            .await
            .unwrap();

        assert_eq!(out["query"], "electric vehicles");
        assert_eq!(out["results"].as_array().unwrap().len(), 2);
        assert_eq!(out["results"][0]["title"], "ev");
    }

    #[tokio::test]
    async fn test_web_search_tool_rejects_bad_args() {
        let tool = WebSearchTool::new(Arc::new(FixedSearch { results: vec![] }));
        let err = tool.execute(json!({ "max_results": 3 })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)));
    }

    #[test]
    fn test_find_tool() {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(WebSearchTool::new(Arc::new(
            FixedSearch { results: vec![] },
        )))];

        assert!(find_tool(&tools, "web_search").is_ok());
        let err = find_tool(&tools, "calculator").unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
    }
}
