//! Planner trait and implementations
//!
//! The planner uses the completion model to decompose a research goal into
//! an ordered list of subtasks.

use crate::models::Task;
use crate::Result;
use async_trait::async_trait;

pub mod llm;
pub use llm::{parse_plan_response, LlmPlanner};

/// Trait for plan generation (LLM controlled)
#[async_trait]
pub trait Planner: Send + Sync {
    /// Decompose `goal` into tasks, preserving the order the model emitted them
    async fn plan(&self, goal: &str) -> Result<Vec<Task>>;
}
