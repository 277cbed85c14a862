//! Core data models for the research pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key/value metadata attached to a memory record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

//
// ================= Plan =================
//

/// One decomposed unit of a research goal.
///
/// Created by the planner and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub search_query: String,
}

impl Task {
    pub fn new(
        index: usize,
        title: impl Into<String>,
        description: impl Into<String>,
        search_query: impl Into<String>,
    ) -> Self {
        Self {
            id: task_id(index),
            title: title.into(),
            description: description.into(),
            search_query: search_query.into(),
        }
    }
}

/// Identifier for the task at zero-based position `index`.
pub fn task_id(index: usize) -> String {
    format!("task-{}", index + 1)
}

//
// ================= Retrieval =================
//

/// Citation record backing a finding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

impl Source {
    /// Build a source whose snippet is the first `SNIPPET_CHARS` characters of `content`.
    pub fn from_content(url: impl Into<String>, title: impl Into<String>, content: &str) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: snippet(content),
        }
    }
}

pub const SNIPPET_CHARS: usize = 200;

/// First `SNIPPET_CHARS` characters of `content` (character based, never splits a code point).
pub fn snippet(content: &str) -> String {
    content.chars().take(SNIPPET_CHARS).collect()
}

//
// ================= Execution =================
//

/// Output of executing one task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    pub findings: String,
    pub sources: Vec<Source>,
    pub tags: Vec<String>,
    /// Diagnostics from degraded but non-fatal steps (failed provider, unparseable tags, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// A task together with its finding, as handed to the synthesizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskFindings {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub findings: String,
}

impl TaskFindings {
    pub fn from_task(task: &Task, findings: impl Into<String>) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            findings: findings.into(),
        }
    }
}

//
// ================= Memory =================
//

/// One stored finding: content plus flattened scalar metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub content: String,
    pub metadata: Metadata,
}

//
// ================= Final Report =================
//

/// Per-task slice of a full research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub task: Task,
    pub result: ExecutionResult,
}

/// Terminal artifact of `ResearchAgent::run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub goal: String,
    pub tasks: Vec<TaskOutcome>,
    pub report: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.title)
    }
}
