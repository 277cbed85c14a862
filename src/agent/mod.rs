//! Research agent - the service boundary
//!
//! GOAL → PLAN → (RETRIEVE → SYNTHESIZE → TAG → REMEMBER) per task → REPORT
//!
//! Each request runs its own sequential pipeline; the memory store is the
//! only component shared between requests.

use crate::config::Settings;
use crate::error::ResearchError;
use crate::execution::TaskExecutor;
use crate::llm::{ChatCompletionClient, CompletionClient};
use crate::memory::{MemoryStore, MemoryWrite};
use crate::models::{
    ExecutionResult, MemoryRecord, Metadata, ResearchReport, Task, TaskFindings, TaskOutcome,
};
use crate::planner::{LlmPlanner, Planner};
use crate::retrieval::Retriever;
use crate::synthesis::ReportSynthesizer;
use crate::Result;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub struct ResearchAgent {
    planner: Box<dyn Planner>,
    executor: TaskExecutor,
    synthesizer: ReportSynthesizer,
    memory: Arc<MemoryStore>,
}

impl ResearchAgent {
    pub fn new(
        planner: Box<dyn Planner>,
        executor: TaskExecutor,
        synthesizer: ReportSynthesizer,
        memory: Arc<MemoryStore>,
    ) -> Self {
        Self {
            planner,
            executor,
            synthesizer,
            memory,
        }
    }

    /// Wire the default components around one completion client and retriever.
    pub fn with_components(
        client: Arc<dyn CompletionClient>,
        retriever: Arc<Retriever>,
        memory: Arc<MemoryStore>,
    ) -> Self {
        Self::new(
            Box::new(LlmPlanner::new(client.clone())),
            TaskExecutor::new(client.clone(), retriever),
            ReportSynthesizer::new(client),
            memory,
        )
    }

    /// Build every component from configuration.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let client: Arc<dyn CompletionClient> = Arc::new(ChatCompletionClient::new(&settings.llm)?);
        let retriever = Arc::new(Retriever::from_settings(&settings.retrieval)?);
        let memory = Arc::new(MemoryStore::from_settings(&settings.memory).await?);

        info!(
            model = %settings.llm.model,
            providers = ?retriever.provider_names(),
            "Research agent initialized"
        );

        Ok(Self::with_components(client, retriever, memory))
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    pub async fn plan(&self, goal: &str) -> Result<Vec<Task>> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(ResearchError::InvalidRequest(
                "Research goal must not be empty".to_string(),
            ));
        }
        self.planner.plan(goal).await
    }

    /// Execute one task and remember its finding.
    pub async fn execute_task(&self, task: &Task) -> Result<ExecutionResult> {
        let mut result = self.executor.execute(task).await?;

        let mut metadata = Metadata::new();
        metadata.insert("task_id".to_string(), json!(task.id));
        metadata.insert("task_title".to_string(), json!(task.title));
        metadata.insert("tags".to_string(), json!(result.tags));

        match self.memory.add(&result.findings, Some(metadata)).await {
            Ok(MemoryWrite { warning: Some(w) }) => result.warnings.push(w),
            Ok(_) => {}
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Failed to store finding in memory");
                result.warnings.push(format!("memory write failed: {}", e));
            }
        }

        Ok(result)
    }

    pub async fn synthesize(&self, goal: &str, tasks: &[TaskFindings]) -> Result<String> {
        self.synthesizer.synthesize(goal, tasks).await
    }

    pub async fn remember(&self, content: &str, metadata: Option<Metadata>) -> Result<MemoryWrite> {
        self.memory.add(content, metadata).await
    }

    pub async fn recall(&self, query: &str, k: usize) -> Result<Vec<MemoryRecord>> {
        self.memory.search(query, k).await
    }

    pub async fn recall_all(&self, k: usize) -> Result<Vec<MemoryRecord>> {
        self.memory.all(k).await
    }

    /// Full pipeline: plan, execute every task in planner order, synthesize.
    pub async fn run(&self, goal: &str) -> Result<ResearchReport> {
        let start = Instant::now();
        let tasks = self.plan(goal).await?;

        info!(task_count = tasks.len(), "Executing plan");

        let mut outcomes = Vec::with_capacity(tasks.len());
        for task in tasks {
            let result = self.execute_task(&task).await?;
            outcomes.push(TaskOutcome { task, result });
        }

        let findings: Vec<TaskFindings> = outcomes
            .iter()
            .map(|o| TaskFindings::from_task(&o.task, o.result.findings.clone()))
            .collect();

        let report = self.synthesize(goal.trim(), &findings).await?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Research run completed"
        );

        Ok(ResearchReport {
            goal: goal.trim().to_string(),
            tasks: outcomes,
            report,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedCompletionClient;
    use crate::memory::{HashingEmbedder, InMemoryVectorIndex};

    fn memory() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(Arc::new(InMemoryVectorIndex::new(
            Arc::new(HashingEmbedder::default()),
        ))))
    }

    fn agent(client: Arc<ScriptedCompletionClient>) -> ResearchAgent {
        ResearchAgent::with_components(client, Arc::new(Retriever::new()), memory())
    }

    #[tokio::test]
    async fn test_blank_goal_is_rejected_without_model_call() {
        let client = Arc::new(ScriptedCompletionClient::default());
        let agent = agent(client.clone());

        let err = agent.plan("   ").await.unwrap_err();
        assert!(matches!(err, ResearchError::InvalidRequest(_)));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_execute_task_stores_finding_with_metadata() {
        let client = Arc::new(ScriptedCompletionClient::new([
            "Tidal arrays produce predictable power.",
            r#"["tidal power", "predictability"]"#,
        ]));
        let agent = agent(client);
        let task = Task::new(0, "Tidal power", "How predictable?", "tidal energy");

        let result = agent.execute_task(&task).await.unwrap();
        assert_eq!(result.tags, vec!["tidal power", "predictability"]);

        let stored = agent.recall("tidal power", 5).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, "Tidal arrays produce predictable power.");
        assert_eq!(stored[0].metadata["task_id"], "task-1");
        assert_eq!(stored[0].metadata["task_title"], "Tidal power");
        assert_eq!(stored[0].metadata["tags"], "tidal power, predictability");
    }

    #[tokio::test]
    async fn test_run_stops_on_planning_error() {
        let client = Arc::new(ScriptedCompletionClient::new(["no plan for you"]));
        let agent = agent(client.clone());

        let err = agent.run("Impact of X on Y").await.unwrap_err();
        assert!(matches!(err, ResearchError::PlanningError(_)));
        assert_eq!(client.calls().len(), 1);
        assert!(agent.recall_all(10).await.unwrap().is_empty());
    }
}
