// SPDX-License-Identifier: MIT

//! Web search adapter backed by the Tavily API.

use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::env;

/// A single web search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Narrow interface to the web search service.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchResult>, SearchError>;
}

pub struct TavilySearch {
    client: Client,
    api_key: String,
}

impl TavilySearch {
    pub fn new() -> Result<Self, SearchError> {
        let api_key = env::var("TAVILY_API_KEY")
            .map_err(|_| SearchError::config("TAVILY_API_KEY must be set"))?;
        Ok(Self {
            client: Client::new(),
            api_key,
        })
    }

    fn parse_results(body: &Value) -> Result<Vec<SearchResult>, SearchError> {
        let results = body
            .get("results")
            .and_then(|r| r.as_array())
            .ok_or_else(|| {
                SearchError::InvalidResponse("missing results array".to_string())
            })?;

        Ok(results
            .iter()
            .map(|r| SearchResult {
                title: r["title"].as_str().unwrap_or_default().to_string(),
                url: r["url"].as_str().unwrap_or_default().to_string(),
                snippet: r["content"].as_str().unwrap_or_default().to_string(),
            })
            .collect())
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": max_results.min(20),
        });

        let resp = self
            .client
            .post("https://api.tavily.com/search")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(SearchError::api("tavily", text));
        }

        let body: Value = resp.json().await?;
        Self::parse_results(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_results() {
        let body = json!({
            "results": [
                {"title": "EV sales", "url": "https://example.com/ev", "content": "Sales rose 30%"},
                {"title": "Battery tech", "url": "https://example.com/battery", "content": "Solid state"}
            ]
        });

        let results = TavilySearch::parse_results(&body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "EV sales");
        assert_eq!(results[1].snippet, "Solid state");
    }

    #[test]
    fn test_parse_missing_results() {
        let body = json!({ "detail": "invalid api key" });
        let err = TavilySearch::parse_results(&body).unwrap_err();
        assert!(matches!(err, SearchError::InvalidResponse(_)));
    }
}
