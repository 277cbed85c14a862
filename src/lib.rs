//! Research Agent
//!
//! Turns a free-text research goal into a structured report:
//! - Decomposes the goal into ordered subtasks with a language model
//! - Retrieves context per subtask from web search and the arXiv feed
//! - Synthesizes and tags a finding for every subtask
//! - Remembers findings in a similarity-searchable memory store
//! - Combines all findings into one final report
//!
//! PIPELINE:
//! GOAL → PLAN → (RETRIEVE → SYNTHESIZE → TAG → REMEMBER) per task → REPORT

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod extraction;
pub mod llm;
pub mod memory;
pub mod models;
pub mod planner;
pub mod prompts;
pub mod retrieval;
pub mod synthesis;

pub use error::Result;

// Re-export common types
pub use agent::ResearchAgent;
pub use config::Settings;
pub use models::*;
