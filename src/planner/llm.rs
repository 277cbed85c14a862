//! Completion-backed planner for goal decomposition

use crate::error::ResearchError;
use crate::extraction::{extract_json_object, ExtractionError};
use crate::llm::CompletionClient;
use crate::models::Task;
use crate::prompts;
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub struct LlmPlanner {
    client: Arc<dyn CompletionClient>,
}

impl LlmPlanner {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl crate::planner::Planner for LlmPlanner {
    async fn plan(&self, goal: &str) -> Result<Vec<Task>> {
        let response = self
            .client
            .complete(prompts::PLANNER_SYSTEM_PROMPT, &prompts::planner_message(goal))
            .await?;

        let tasks = parse_plan_response(&response)?;
        info!(task_count = tasks.len(), "Plan generated");
        Ok(tasks)
    }
}

/// Parse a planner response into tasks.
///
/// Only the outermost `{...}` span is parsed. Identifiers are always
/// reassigned as `task-1..task-n` in emitted order; fields are trimmed and
/// default to empty. Entries without a title are dropped before numbering.
pub fn parse_plan_response(response: &str) -> Result<Vec<Task>> {
    let raw = response.trim();

    let json = extract_json_object(raw).map_err(|e| match e {
        ExtractionError::NoSpan { .. } => ResearchError::PlanningError(format!(
            "Model did not return JSON | raw={}",
            raw
        )),
        ExtractionError::InvalidJson { source, .. } => ResearchError::PlanningError(format!(
            "Failed to parse plan JSON: {} | raw={}",
            source, raw
        )),
    })?;

    let entries = match json.get("tasks") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(ResearchError::PlanningError(format!(
                "\"tasks\" is not an array | raw={}",
                raw
            )))
        }
    };

    let mut tasks = Vec::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        if !entry.is_object() {
            return Err(ResearchError::PlanningError(format!(
                "Task entry {} is not an object | raw={}",
                position + 1,
                raw
            )));
        }

        let title = text_field(entry, "title");
        if title.is_empty() {
            warn!(position = position + 1, "Dropping planned task without a title");
            continue;
        }

        tasks.push(Task::new(
            tasks.len(),
            title,
            text_field(entry, "description"),
            text_field(entry, "search_query"),
        ));
    }

    Ok(tasks)
}

fn text_field(entry: &Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
