//! Vector index seam and the in-process implementation

use super::embedder::Embedder;
use crate::error::ResearchError;
use crate::models::{MemoryRecord, Metadata};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Trait for the similarity-searchable record store
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store one record; metadata values are already scalar
    async fn add(&self, content: &str, metadata: Metadata) -> Result<()>;

    /// Up to `k` records ordered by decreasing similarity to `query`
    async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>>;

    /// Flush to durable storage, if the index has any
    async fn persist(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedRecord {
    id: Uuid,
    content: String,
    metadata: Metadata,
    embedding: Vec<f32>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    collection: String,
    records: Vec<IndexedRecord>,
}

/// Cosine-similarity index held in memory, optionally snapshotted to JSON
pub struct InMemoryVectorIndex {
    collection: String,
    records: RwLock<Vec<IndexedRecord>>,
    embedder: Arc<dyn Embedder>,
    snapshot_path: Option<PathBuf>,
    /// Held for a whole flush; snapshots share one tmp file
    write_lock: Mutex<()>,
}

impl InMemoryVectorIndex {
    /// Ephemeral index, nothing is written to disk
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            collection: "research_memory".to_string(),
            records: RwLock::new(Vec::new()),
            embedder,
            snapshot_path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Index backed by `{persist_dir}/{collection}.json`, loading it when present
    pub async fn open(
        embedder: Arc<dyn Embedder>,
        collection: &str,
        persist_dir: &Path,
    ) -> Result<Self> {
        let snapshot_path = persist_dir.join(format!("{}.json", collection));

        let records = match tokio::fs::read(&snapshot_path).await {
            Ok(bytes) => {
                let snapshot: Snapshot = serde_json::from_slice(&bytes).map_err(|e| {
                    ResearchError::MemoryError(format!(
                        "Corrupt memory snapshot {}: {}",
                        snapshot_path.display(),
                        e
                    ))
                })?;
                info!(
                    path = %snapshot_path.display(),
                    records = snapshot.records.len(),
                    "Loaded memory snapshot"
                );
                snapshot.records
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            collection: collection.to_string(),
            records: RwLock::new(records),
            embedder,
            snapshot_path: Some(snapshot_path),
            write_lock: Mutex::new(()),
        })
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn add(&self, content: &str, metadata: Metadata) -> Result<()> {
        let embedding = self.embedder.embed(content).await?;

        let record = IndexedRecord {
            id: Uuid::new_v4(),
            content: content.to_string(),
            metadata,
            embedding,
            created_at: Utc::now(),
        };

        debug!(record_id = %record.id, "Indexing memory record");
        self.records.write().await.push(record);
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        // A blank query has no meaningful embedding; every record ties.
        let query_embedding = if query.trim().is_empty() {
            None
        } else {
            Some(self.embedder.embed(query).await?)
        };

        let records = self.records.read().await;

        let mut scored: Vec<(f32, &IndexedRecord)> = records
            .iter()
            .map(|record| {
                let score = query_embedding
                    .as_deref()
                    .map(|q| cosine_similarity(q, &record.embedding))
                    .unwrap_or(0.0);
                (score, record)
            })
            .collect();

        // stable: ties keep insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, record)| MemoryRecord {
                content: record.content.clone(),
                metadata: record.metadata.clone(),
            })
            .collect())
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = self.snapshot_path.as_ref() else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;

        let bytes = {
            let records = self.records.read().await;
            serde_json::to_vec(&Snapshot {
                collection: self.collection.clone(),
                records: records.clone(),
            })?
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // write-then-rename
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "Memory snapshot written");
        Ok(())
    }
}
