//! Task executor
//!
//! Runs one task strictly in sequence: retrieve context, synthesize the
//! finding, derive tags. Persistence is left to the caller.

use crate::extraction;
use crate::llm::CompletionClient;
use crate::models::{ExecutionResult, Task};
use crate::prompts;
use crate::retrieval::Retriever;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Separator between retrieved documents in the synthesis context
pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub struct TaskExecutor {
    client: Arc<dyn CompletionClient>,
    retriever: Arc<Retriever>,
}

impl TaskExecutor {
    pub fn new(client: Arc<dyn CompletionClient>, retriever: Arc<Retriever>) -> Self {
        Self { client, retriever }
    }

    pub async fn execute(&self, task: &Task) -> Result<ExecutionResult> {
        let start = Instant::now();
        info!(task_id = %task.id, title = %task.title, "Executing task");

        // 1. Retrieval (never fails)
        let retrieval = self.retriever.retrieve(&task.search_query).await;
        let mut warnings = retrieval.warnings;
        let context = retrieval.documents.join(CONTEXT_SEPARATOR);

        debug!(
            task_id = %task.id,
            documents = retrieval.documents.len(),
            context_chars = context.len(),
            "Context assembled"
        );

        // 2. Finding synthesis
        let findings = self
            .client
            .complete(
                prompts::SYNTHESIS_SYSTEM_PROMPT,
                &prompts::synthesis_message(&task.title, &context),
            )
            .await?
            .trim()
            .to_string();

        // 3. Tagging (non-fatal)
        let tags = match self
            .client
            .complete(prompts::TAGGING_SYSTEM_PROMPT, &findings)
            .await
        {
            Ok(raw) => match extraction::try_parse_tags(raw.trim()) {
                Ok(tags) => tags,
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "Unparseable tag output");
                    warnings.push(format!("tag extraction failed: {}", e));
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Tagging call failed");
                warnings.push(format!("tagging call failed: {}", e));
                Vec::new()
            }
        };

        info!(
            task_id = %task.id,
            tags = tags.len(),
            sources = retrieval.sources.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Task executed"
        );

        Ok(ExecutionResult {
            findings,
            sources: retrieval.sources,
            tags,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResearchError;
    use crate::llm::ScriptedCompletionClient;
    use crate::retrieval::testing::{hit, StaticProvider};

    fn task() -> Task {
        Task::new(0, "Battery chemistry", "Compare chemistries", "lithium sulfur")
    }

    fn retriever() -> Arc<Retriever> {
        Arc::new(
            Retriever::new()
                .with_provider(StaticProvider::hits(
                    "web",
                    vec![hit("https://a", "Doc A"), hit("https://b", "Doc B")],
                ))
                .with_provider(StaticProvider::failing("arxiv")),
        )
    }

    #[tokio::test]
    async fn test_execute_produces_findings_sources_and_tags() {
        let client = Arc::new(ScriptedCompletionClient::new([
            "  Lithium-sulfur cells trade cycle life for energy density.  ",
            r#"Tags: ["energy density", "cycle life"]"#,
        ]));
        let retriever = retriever();
        let executor = TaskExecutor::new(client.clone(), retriever.clone());

        let result = executor.execute(&task()).await.unwrap();

        assert_eq!(
            result.findings,
            "Lithium-sulfur cells trade cycle life for energy density."
        );
        assert_eq!(result.tags, vec!["energy density", "cycle life"]);

        // sources pass through unmodified
        let expected = retriever.retrieve("lithium sulfur").await;
        assert_eq!(result.sources, expected.sources);
        assert_eq!(result.warnings.len(), 1);

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].system_instruction, prompts::SYNTHESIS_SYSTEM_PROMPT);
        assert_eq!(
            calls[0].human_message,
            "Task: Battery chemistry\n\nContext:\nDoc A\n\nDoc B"
        );
        assert_eq!(calls[1].system_instruction, prompts::TAGGING_SYSTEM_PROMPT);
        assert_eq!(
            calls[1].human_message,
            "Lithium-sulfur cells trade cycle life for energy density."
        );
    }

    #[tokio::test]
    async fn test_bad_tags_degrade_to_empty() {
        let client = Arc::new(ScriptedCompletionClient::new([
            "finding",
            "energy density, cycle life",
        ]));
        let executor = TaskExecutor::new(client, retriever());

        let result = executor.execute(&task()).await.unwrap();
        assert_eq!(result.findings, "finding");
        assert!(result.tags.is_empty());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.starts_with("tag extraction failed")));
    }

    #[tokio::test]
    async fn test_tagging_call_failure_is_not_fatal() {
        let client = Arc::new(ScriptedCompletionClient::new(["finding"]));
        let executor = TaskExecutor::new(client, retriever());

        let result = executor.execute(&task()).await.unwrap();
        assert!(result.tags.is_empty());
        assert!(result.warnings.iter().any(|w| w.starts_with("tagging call failed")));
    }

    #[tokio::test]
    async fn test_synthesis_failure_propagates() {
        let client = Arc::new(ScriptedCompletionClient::default());
        client.push(Err(ResearchError::ConfigurationError(
            "GROQ_API_KEY is not configured".to_string(),
        )));
        let executor = TaskExecutor::new(client, retriever());

        let err = executor.execute(&task()).await.unwrap_err();
        assert!(matches!(err, ResearchError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_fallback_context_when_nothing_retrieved() {
        let client = Arc::new(ScriptedCompletionClient::new(["finding", "[]"]));
        let executor = TaskExecutor::new(client.clone(), Arc::new(Retriever::new()));

        let result = executor.execute(&task()).await.unwrap();
        assert!(result.sources.is_empty());
        assert!(client.calls()[0]
            .human_message
            .ends_with("Research query: lithium sulfur. Generate insights from global knowledge."));
    }
}
