//! Research memory
//!
//! Findings are stored with scalar metadata in a similarity-searchable
//! `VectorIndex`. The store is constructed once at process start and shared
//! by reference; it holds no global state.

use crate::config::MemorySettings;
use crate::models::{MemoryRecord, Metadata};
use crate::Result;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub mod embedder;
pub mod index;

pub use embedder::{Embedder, HashingEmbedder, HttpEmbedder};
pub use index::{InMemoryVectorIndex, VectorIndex};

pub const DEFAULT_SEARCH_K: usize = 5;
pub const DEFAULT_ALL_K: usize = 50;

/// Outcome of a memory write whose flush is best-effort
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MemoryWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub struct MemoryStore {
    index: Arc<dyn VectorIndex>,
}

impl MemoryStore {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    /// Store from configuration: HTTP embeddings when a key is present,
    /// feature hashing otherwise; snapshot persistence when a directory is set.
    pub async fn from_settings(settings: &MemorySettings) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = match settings.embedding_api_key.clone() {
            Some(api_key) => {
                info!(model = %settings.embedding_model, "Using HTTP embeddings");
                Arc::new(HttpEmbedder::new(
                    api_key,
                    settings.embedding_base_url.clone(),
                    settings.embedding_model.clone(),
                )?)
            }
            None => Arc::new(HashingEmbedder::default()),
        };

        let index = match settings.persist_dir.as_deref() {
            Some(dir) => InMemoryVectorIndex::open(embedder, &settings.collection, dir).await?,
            None => InMemoryVectorIndex::new(embedder),
        };

        Ok(Self::new(Arc::new(index)))
    }

    /// Store `content` with flattened metadata, then flush best-effort.
    pub async fn add(&self, content: &str, metadata: Option<Metadata>) -> Result<MemoryWrite> {
        let metadata = flatten_metadata(metadata.unwrap_or_default());
        self.index.add(content, metadata).await?;

        match self.index.persist().await {
            Ok(()) => Ok(MemoryWrite::default()),
            Err(e) => {
                warn!(error = %e, "Memory flush failed");
                Ok(MemoryWrite {
                    warning: Some(format!("memory flush failed: {}", e)),
                })
            }
        }
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>> {
        self.index.search(query, k).await
    }

    /// Up to `k` records via an empty query. Not a guaranteed complete scan.
    pub async fn all(&self, k: usize) -> Result<Vec<MemoryRecord>> {
        self.index.search("", k).await
    }
}

/// Make every metadata value scalar.
///
/// Lists become a `", "`-joined string of their elements (strings verbatim,
/// anything else as JSON text); nested objects become their JSON text; nulls
/// are dropped.
pub fn flatten_metadata(metadata: Metadata) -> Metadata {
    metadata
        .into_iter()
        .filter_map(|(key, value)| {
            let flat = match value {
                Value::Null => return None,
                Value::Array(items) => Value::String(
                    items
                        .iter()
                        .map(element_text)
                        .collect::<Vec<_>>()
                        .join(", "),
                ),
                Value::Object(_) => Value::String(value.to_string()),
                scalar => scalar,
            };
            Some((key, flat))
        })
        .collect()
}

fn element_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResearchError;
    use async_trait::async_trait;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_flatten_metadata() {
        let flat = flatten_metadata(metadata(json!({
            "task_id": "task-1",
            "tags": ["a", "b"],
            "mixed": ["x", 2, true],
            "score": 0.5,
            "nested": {"k": "v"},
            "missing": null
        })));

        assert_eq!(flat["task_id"], "task-1");
        assert_eq!(flat["tags"], "a, b");
        assert_eq!(flat["mixed"], "x, 2, true");
        assert_eq!(flat["score"], 0.5);
        assert_eq!(flat["nested"], r#"{"k":"v"}"#);
        assert!(!flat.contains_key("missing"));
    }

    #[tokio::test]
    async fn test_list_metadata_reads_back_flattened() {
        let store = MemoryStore::new(Arc::new(InMemoryVectorIndex::new(Arc::new(
            HashingEmbedder::default(),
        ))));

        let write = store
            .add(
                "Findings about tidal energy",
                Some(metadata(json!({"task_id": "task-1", "tags": ["a", "b"]}))),
            )
            .await
            .unwrap();
        assert!(write.warning.is_none());

        let results = store.search("tidal energy", DEFAULT_SEARCH_K).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].metadata["tags"], json!("a, b"));

        let everything = store.all(DEFAULT_ALL_K).await.unwrap();
        assert_eq!(everything.len(), 1);
    }

    #[tokio::test]
    async fn test_add_without_metadata() {
        let store = MemoryStore::new(Arc::new(InMemoryVectorIndex::new(Arc::new(
            HashingEmbedder::default(),
        ))));
        store.add("bare", None).await.unwrap();
        assert!(store.all(10).await.unwrap()[0].metadata.is_empty());
    }

    struct UnflushableIndex {
        inner: InMemoryVectorIndex,
    }

    #[async_trait]
    impl VectorIndex for UnflushableIndex {
        async fn add(&self, content: &str, metadata: Metadata) -> Result<()> {
            self.inner.add(content, metadata).await
        }

        async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>> {
            self.inner.search(query, k).await
        }

        async fn persist(&self) -> Result<()> {
            Err(ResearchError::MemoryError("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_flush_failure_is_a_warning() {
        let store = MemoryStore::new(Arc::new(UnflushableIndex {
            inner: InMemoryVectorIndex::new(Arc::new(HashingEmbedder::default())),
        }));

        let write = store.add("kept anyway", None).await.unwrap();
        assert!(write.warning.unwrap().contains("disk full"));
        assert_eq!(store.all(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_from_settings_without_persistence() {
        let settings = MemorySettings {
            persist_dir: None,
            ..MemorySettings::default()
        };
        let store = MemoryStore::from_settings(&settings).await.unwrap();
        store.add("x", None).await.unwrap();
        assert_eq!(store.search("x", 5).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_adds_flush_without_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = MemorySettings {
            persist_dir: Some(dir.path().to_path_buf()),
            ..MemorySettings::default()
        };
        let store = Arc::new(MemoryStore::from_settings(&settings).await.unwrap());

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.add(&format!("finding {}", i), None).await })
            })
            .collect();

        for handle in handles {
            let write = handle.await.unwrap().unwrap();
            assert_eq!(write.warning, None);
        }

        let reopened = MemoryStore::from_settings(&settings).await.unwrap();
        assert_eq!(reopened.all(100).await.unwrap().len(), 40);
    }
}
