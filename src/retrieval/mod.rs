//! Document retrieval
//!
//! Search providers are queried strictly in registration order. A failing
//! provider is logged and recorded as a warning; retrieval itself never
//! fails and never returns an empty document list.

use crate::config::RetrievalSettings;
use crate::models::Source;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod arxiv;
pub mod web;

pub use arxiv::{parse_atom_feed, ArxivClient, FeedEntry};
pub use web::WebSearchClient;

/// One retrieved document with its citation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub content: String,
    pub source: Source,
}

/// Trait for a single search collaborator
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Documents and sources for one query, in provider order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalOutcome {
    pub documents: Vec<String>,
    pub sources: Vec<Source>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RetrievalOutcome {
    /// True when no provider contributed and the synthetic document was substituted
    pub fn is_fallback(&self) -> bool {
        self.sources.is_empty() && self.documents.len() == 1
    }
}

/// Synthetic context used when every provider came back empty
pub fn fallback_document(query: &str) -> String {
    format!(
        "Research query: {}. Generate insights from global knowledge.",
        query
    )
}

pub struct Retriever {
    providers: Vec<Arc<dyn SearchProvider>>,
}

impl Retriever {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Standard provider chain: keyed web search (only with a credential),
    /// then the literature feed (always).
    pub fn from_settings(settings: &RetrievalSettings) -> Result<Self> {
        let mut retriever = Self::new();

        match WebSearchClient::from_settings(settings)? {
            Some(web) => retriever = retriever.with_provider(Arc::new(web)),
            None => info!("TAVILY_API_KEY not set, web search disabled"),
        }

        let arxiv = ArxivClient::new(
            settings.arxiv_base_url.clone(),
            settings.arxiv_max_results,
            settings.timeout,
        )?;

        Ok(retriever.with_provider(Arc::new(arxiv)))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn retrieve(&self, query: &str) -> RetrievalOutcome {
        let mut outcome = RetrievalOutcome::default();

        for provider in &self.providers {
            match provider.search(query).await {
                Ok(hits) => {
                    debug!(provider = provider.name(), hits = hits.len(), "Provider returned");
                    for hit in hits {
                        outcome.documents.push(hit.content);
                        outcome.sources.push(hit.source);
                    }
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Search provider failed");
                    outcome
                        .warnings
                        .push(format!("{} search failed: {}", provider.name(), e));
                }
            }
        }

        if outcome.documents.is_empty() {
            info!("No documents retrieved, substituting synthetic context");
            outcome.documents = vec![fallback_document(query)];
            outcome.sources.clear();
        }

        outcome
    }
}

impl Default for Retriever {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{hit, StaticProvider};
    use super::*;

    #[tokio::test]
    async fn test_concatenates_in_provider_order() {
        let retriever = Retriever::new()
            .with_provider(StaticProvider::hits(
                "web",
                vec![hit("https://a", "A1"), hit("https://b", "A2")],
            ))
            .with_provider(StaticProvider::hits("arxiv", vec![hit("https://c", "B1")]));

        let outcome = retriever.retrieve("q").await;
        assert_eq!(outcome.documents, vec!["A1", "A2", "B1"]);
        assert_eq!(
            outcome.sources.iter().map(|s| s.url.as_str()).collect::<Vec<_>>(),
            vec!["https://a", "https://b", "https://c"]
        );
        assert!(outcome.warnings.is_empty());
        assert!(!outcome.is_fallback());
    }

    #[tokio::test]
    async fn test_one_failure_is_a_warning() {
        let retriever = Retriever::new()
            .with_provider(StaticProvider::failing("web"))
            .with_provider(StaticProvider::hits("arxiv", vec![hit("https://c", "B1")]));

        let outcome = retriever.retrieve("q").await;
        assert_eq!(outcome.documents, vec!["B1"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("web search failed"));
    }

    #[tokio::test]
    async fn test_all_failing_yields_single_synthetic_document() {
        let retriever = Retriever::new()
            .with_provider(StaticProvider::failing("web"))
            .with_provider(StaticProvider::hits("arxiv", vec![]));

        let outcome = retriever.retrieve("solid-state batteries").await;
        assert_eq!(
            outcome.documents,
            vec!["Research query: solid-state batteries. Generate insights from global knowledge."]
        );
        assert!(outcome.sources.is_empty());
        assert!(outcome.is_fallback());
    }

    #[tokio::test]
    async fn test_no_providers_still_has_context() {
        let outcome = Retriever::new().retrieve("").await;
        assert_eq!(outcome.documents.len(), 1);
        assert!(outcome.sources.is_empty());
    }

    #[test]
    fn test_from_settings_skips_web_without_key() {
        let settings = RetrievalSettings::default();
        let retriever = Retriever::from_settings(&settings).unwrap();
        assert_eq!(retriever.provider_names(), vec!["arxiv"]);

        let keyed = RetrievalSettings {
            tavily_api_key: Some("tvly-test".to_string()),
            ..RetrievalSettings::default()
        };
        let retriever = Retriever::from_settings(&keyed).unwrap();
        assert_eq!(retriever.provider_names(), vec!["tavily", "arxiv"]);
    }
}
