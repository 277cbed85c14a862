//! Keyed web search (Tavily-compatible API)

use super::{SearchHit, SearchProvider};
use crate::config::RetrievalSettings;
use crate::error::ResearchError;
use crate::models::Source;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub struct WebSearchClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_results: usize,
}

impl WebSearchClient {
    pub fn new(
        api_key: String,
        base_url: String,
        max_results: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_results,
        })
    }

    /// `None` when no credential is configured
    pub fn from_settings(settings: &RetrievalSettings) -> Result<Option<Self>> {
        let Some(api_key) = settings.tavily_api_key.clone() else {
            return Ok(None);
        };

        Self::new(
            api_key,
            settings.tavily_base_url.clone(),
            settings.web_results,
            settings.timeout,
        )
        .map(Some)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    url: Option<String>,
    title: Option<String>,
    content: Option<String>,
}

#[async_trait]
impl SearchProvider for WebSearchClient {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .post(url)
            .json(&json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": self.max_results,
            }))
            .send()
            .await
            .map_err(|e| ResearchError::RetrievalError(format!("Web search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::RetrievalError(format!(
                "Web search returned {}: {}",
                status, body
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::RetrievalError(format!("Invalid web search JSON: {}", e)))?;

        let hits: Vec<SearchHit> = body
            .results
            .into_iter()
            .filter_map(|r| {
                let url = r.url?;
                let content = r.content?;
                let title = r
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| url.clone());
                Some(SearchHit {
                    source: Source::from_content(url, title, &content),
                    content,
                })
            })
            .take(self.max_results)
            .collect();

        debug!(hits = hits.len(), "Web search completed");
        Ok(hits)
    }
}
