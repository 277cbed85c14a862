//! REST API server for the research agent
//!
//! Maps the service boundary 1:1 onto HTTP endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::ResearchAgent;
use crate::error::ResearchError;
use crate::memory::{DEFAULT_ALL_K, DEFAULT_SEARCH_K};
use crate::models::{Metadata, Task, TaskFindings};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanRequest {
    pub goal: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteTaskRequest {
    pub task: Task,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesizeRequest {
    pub goal: String,
    pub tasks_with_findings: Vec<TaskFindings>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryAddRequest {
    pub content: String,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemorySearchRequest {
    pub query: String,
    #[serde(default = "default_search_k")]
    pub k: usize,
}

#[derive(Debug, Deserialize)]
pub struct MemoryAllParams {
    pub k: Option<usize>,
}

fn default_search_k() -> usize {
    DEFAULT_SEARCH_K
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn failure(context: &str, err: ResearchError) -> ApiResult {
    let status = match &err {
        ResearchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ResearchError::PlanningError(_) | ResearchError::LlmError(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error!(%status, "{} failed: {}", context, err);
    (
        status,
        Json(ApiResponse::error(format!("{} failed: {}", context, err))),
    )
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<ResearchAgent>,
}

/// =============================
/// Endpoints
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn plan(State(state): State<ApiState>, Json(req): Json<PlanRequest>) -> ApiResult {
    info!("Received plan request: {}", req.goal);

    match state.agent.plan(&req.goal).await {
        Ok(tasks) => ok(tasks),
        Err(e) => failure("Planning", e),
    }
}

async fn execute_task(
    State(state): State<ApiState>,
    Json(req): Json<ExecuteTaskRequest>,
) -> ApiResult {
    info!(task_id = %req.task.id, "Received execute_task request");

    match state.agent.execute_task(&req.task).await {
        Ok(result) => ok(result),
        Err(e) => failure("Task execution", e),
    }
}

async fn synthesize(
    State(state): State<ApiState>,
    Json(req): Json<SynthesizeRequest>,
) -> ApiResult {
    match state
        .agent
        .synthesize(&req.goal, &req.tasks_with_findings)
        .await
    {
        Ok(report) => ok(serde_json::json!({ "report": report })),
        Err(e) => failure("Synthesis", e),
    }
}

async fn research(State(state): State<ApiState>, Json(req): Json<PlanRequest>) -> ApiResult {
    info!("Received full research request: {}", req.goal);

    match state.agent.run(&req.goal).await {
        Ok(report) => ok(report),
        Err(e) => failure("Research", e),
    }
}

async fn memory_add(
    State(state): State<ApiState>,
    Json(req): Json<MemoryAddRequest>,
) -> ApiResult {
    match state.agent.remember(&req.content, req.metadata).await {
        Ok(write) => ok(serde_json::json!({
            "status": "ok",
            "warning": write.warning,
        })),
        Err(e) => failure("Memory add", e),
    }
}

async fn memory_search(
    State(state): State<ApiState>,
    Json(req): Json<MemorySearchRequest>,
) -> ApiResult {
    match state.agent.recall(&req.query, req.k).await {
        Ok(results) => ok(serde_json::json!({ "results": results })),
        Err(e) => failure("Memory search", e),
    }
}

async fn memory_all(
    State(state): State<ApiState>,
    Query(params): Query<MemoryAllParams>,
) -> ApiResult {
    match state.agent.recall_all(params.k.unwrap_or(DEFAULT_ALL_K)).await {
        Ok(results) => ok(serde_json::json!({ "results": results })),
        Err(e) => failure("Memory listing", e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(agent: Arc<ResearchAgent>) -> Router {
    let state = ApiState { agent };

    Router::new()
        .route("/health", get(health))
        .route("/plan", post(plan))
        .route("/execute_task", post(execute_task))
        .route("/synthesize", post(synthesize))
        .route("/research", post(research))
        .route("/memory/add", post(memory_add))
        .route("/memory/search", post(memory_search))
        .route("/memory/all", get(memory_all))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    agent: Arc<ResearchAgent>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(agent);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
