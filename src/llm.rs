//! Text-completion client
//!
//! `ChatCompletionClient` talks to any OpenAI-compatible `/chat/completions`
//! endpoint (Groq by default) over a long-lived reqwest::Client.
//! `ScriptedCompletionClient` replays canned responses for tests and
//! offline development.

use crate::config::LlmSettings;
use crate::error::ResearchError;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error, info};

/// Trait for text completion (one system instruction, one human message)
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_instruction: &str, human_message: &str) -> Result<String>;
}

/// Reusable chat-completions client (connection-pooled)
pub struct ChatCompletionClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, system_instruction: &str, human_message: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ResearchError::ConfigurationError("GROQ_API_KEY is not configured".to_string())
        })?;

        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![
                RequestMessage {
                    role: "system",
                    content: system_instruction,
                },
                RequestMessage {
                    role: "user",
                    content: human_message,
                },
            ],
        };

        info!(model = %self.model, "Calling completion API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                ResearchError::LlmError(format!("Completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Completion API error response: {}", error_text);
            return Err(ResearchError::LlmError(format!(
                "Completion API returned {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse completion response: {}", e);
            ResearchError::LlmError(format!("Completion parse error: {}", e))
        })?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ResearchError::LlmError("No choices in completion response".to_string()))?;

        let text = choice.message.content.unwrap_or_default();

        if let Some(usage) = chat_response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                finish_reason = ?choice.finish_reason,
                "Completion received"
            );
        }

        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Recorded call to a `ScriptedCompletionClient`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCall {
    pub system_instruction: String,
    pub human_message: String,
}

/// Scripted completion client for development & testing
///
/// Returns queued responses in order and records every call. Once the queue is
/// empty each further call fails with `LlmError`.
#[derive(Default)]
pub struct ScriptedCompletionClient {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<CompletionCall>>,
}

impl ScriptedCompletionClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response (or failure) after the existing ones
    pub fn push(&self, response: Result<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
    }

    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(&self, system_instruction: &str, human_message: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(CompletionCall {
                system_instruction: system_instruction.to_string(),
                human_message: human_message.to_string(),
            });
        }

        self.responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front())
            .unwrap_or_else(|| {
                Err(ResearchError::LlmError(
                    "Scripted completion client has no responses left".to_string(),
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(base_url: String, api_key: Option<&str>) -> LlmSettings {
        LlmSettings {
            api_key: api_key.map(str::to_string),
            base_url,
            ..LlmSettings::default()
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client =
            ChatCompletionClient::new(&settings("http://127.0.0.1:9".to_string(), None)).unwrap();
        let err = client.complete("system", "human").await.unwrap_err();
        assert!(matches!(err, ResearchError::ConfigurationError(_)));
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .and(body_partial_json(json!({
                "model": "llama-3.1-8b-instant",
                "max_tokens": 2000,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "hi there"}, "finish_reason": "stop"}
                ],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3}
            })))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(&settings(server.uri(), Some("gsk-test"))).unwrap();
        let text = client.complete("be brief", "hello").await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn test_error_status_is_llm_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(&settings(server.uri(), Some("k"))).unwrap();
        match client.complete("s", "h").await {
            Err(ResearchError::LlmError(msg)) => assert!(msg.contains("rate limited")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_scripted_client_replays_in_order() {
        let client = ScriptedCompletionClient::new(["one", "two"]);
        assert_eq!(client.complete("s", "a").await.unwrap(), "one");
        assert_eq!(client.complete("s", "b").await.unwrap(), "two");
        assert!(client.complete("s", "c").await.is_err());

        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].human_message, "b");
    }
}
