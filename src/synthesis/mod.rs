//! Final report synthesis over all task findings

use crate::llm::CompletionClient;
use crate::models::TaskFindings;
use crate::prompts;
use crate::Result;
use std::sync::Arc;
use tracing::info;

/// Separator between per-task blocks
pub const TASK_SEPARATOR: &str = "\n\n---\n\n";

pub struct ReportSynthesizer {
    client: Arc<dyn CompletionClient>,
}

impl ReportSynthesizer {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// One completion call over the goal and every task block, in input order.
    pub async fn synthesize(&self, goal: &str, tasks: &[TaskFindings]) -> Result<String> {
        let block = tasks_block(tasks);

        info!(task_count = tasks.len(), "Synthesizing final report");

        let report = self
            .client
            .complete(
                prompts::REPORT_SYSTEM_PROMPT,
                &prompts::report_message(goal, &block),
            )
            .await?;

        Ok(report.trim().to_string())
    }
}

/// Text block for one task
pub fn task_block(task: &TaskFindings) -> String {
    format!(
        "Task: {}\nDescription: {}\nFindings:\n{}\n",
        task.title, task.description, task.findings
    )
}

/// All task blocks joined by `TASK_SEPARATOR`
pub fn tasks_block(tasks: &[TaskFindings]) -> String {
    tasks
        .iter()
        .map(task_block)
        .collect::<Vec<_>>()
        .join(TASK_SEPARATOR)
}
