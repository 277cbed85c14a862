//! Process configuration
//!
//! All settings come from environment variables (a `.env` file is honoured by
//! the binaries). Credentials stay optional here; the components that need
//! them decide whether their absence is fatal.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";
pub const DEFAULT_ARXIV_BASE_URL: &str = "https://export.arxiv.org/api/query";
pub const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Text-completion settings
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

/// Search collaborator settings
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: String,
    pub web_results: usize,
    pub arxiv_base_url: String,
    pub arxiv_max_results: usize,
    pub timeout: Duration,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            tavily_base_url: DEFAULT_TAVILY_BASE_URL.to_string(),
            web_results: 6,
            arxiv_base_url: DEFAULT_ARXIV_BASE_URL.to_string(),
            arxiv_max_results: 4,
            timeout: Duration::from_secs(12),
        }
    }
}

/// Memory store settings
#[derive(Debug, Clone)]
pub struct MemorySettings {
    /// `None` keeps the store purely in memory
    pub persist_dir: Option<PathBuf>,
    pub collection: String,
    pub embedding_api_key: Option<String>,
    pub embedding_base_url: String,
    pub embedding_model: String,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            persist_dir: Some(PathBuf::from("data/memory_store")),
            collection: "research_memory".to_string(),
            embedding_api_key: None,
            embedding_base_url: DEFAULT_EMBEDDING_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub retrieval: RetrievalSettings,
    pub memory: MemorySettings,
    pub port: u16,
}

impl Settings {
    /// Read every setting from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let llm_defaults = LlmSettings::default();
        let retrieval_defaults = RetrievalSettings::default();
        let memory_defaults = MemorySettings::default();

        let llm = LlmSettings {
            api_key: non_empty("GROQ_API_KEY"),
            base_url: non_empty("LLM_BASE_URL").unwrap_or(llm_defaults.base_url),
            model: non_empty("DEFAULT_MODEL").unwrap_or(llm_defaults.model),
            temperature: parse_or(&lookup, "LLM_TEMPERATURE", llm_defaults.temperature),
            max_tokens: parse_or(&lookup, "LLM_MAX_TOKENS", llm_defaults.max_tokens),
        };

        let retrieval = RetrievalSettings {
            tavily_api_key: non_empty("TAVILY_API_KEY"),
            tavily_base_url: non_empty("TAVILY_BASE_URL")
                .unwrap_or(retrieval_defaults.tavily_base_url),
            web_results: parse_or(&lookup, "WEB_SEARCH_RESULTS", retrieval_defaults.web_results),
            arxiv_base_url: non_empty("ARXIV_BASE_URL").unwrap_or(retrieval_defaults.arxiv_base_url),
            arxiv_max_results: parse_or(
                &lookup,
                "ARXIV_MAX_RESULTS",
                retrieval_defaults.arxiv_max_results,
            ),
            timeout: Duration::from_secs(parse_or(
                &lookup,
                "RETRIEVAL_TIMEOUT_SECS",
                retrieval_defaults.timeout.as_secs(),
            )),
        };

        // An explicitly empty MEMORY_PERSIST_DIR disables persistence.
        let persist_dir = match lookup("MEMORY_PERSIST_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => memory_defaults.persist_dir,
        };

        let memory = MemorySettings {
            persist_dir,
            collection: non_empty("MEMORY_COLLECTION").unwrap_or(memory_defaults.collection),
            embedding_api_key: non_empty("EMBEDDING_API_KEY"),
            embedding_base_url: non_empty("EMBEDDING_BASE_URL")
                .unwrap_or(memory_defaults.embedding_base_url),
            embedding_model: non_empty("EMBEDDING_MODEL").unwrap_or(memory_defaults.embedding_model),
        };

        let port = non_empty("PORT")
            .map(|_| parse_or(&lookup, "PORT", 8000))
            .unwrap_or_else(|| parse_or(&lookup, "API_PORT", 8000));

        Self {
            llm,
            retrieval,
            memory,
            port,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Ignoring unparseable setting, using default");
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]);
        assert!(settings.llm.api_key.is_none());
        assert_eq!(settings.llm.model, DEFAULT_MODEL);
        assert_eq!(settings.llm.max_tokens, 2000);
        assert!(settings.retrieval.tavily_api_key.is_none());
        assert_eq!(settings.retrieval.arxiv_max_results, 4);
        assert_eq!(settings.retrieval.timeout, Duration::from_secs(12));
        assert_eq!(settings.memory.collection, "research_memory");
        assert!(settings.memory.persist_dir.is_some());
        assert_eq!(settings.port, 8000);
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let settings = settings_from(&[
            ("GROQ_API_KEY", "gsk-test"),
            ("DEFAULT_MODEL", "llama-3.3-70b"),
            ("LLM_TEMPERATURE", "not-a-number"),
            ("TAVILY_API_KEY", "  "),
            ("MEMORY_PERSIST_DIR", ""),
            ("API_PORT", "9090"),
        ]);
        assert_eq!(settings.llm.api_key.as_deref(), Some("gsk-test"));
        assert_eq!(settings.llm.model, "llama-3.3-70b");
        assert_eq!(settings.llm.temperature, 0.3);
        assert!(settings.retrieval.tavily_api_key.is_none());
        assert!(settings.memory.persist_dir.is_none());
        assert_eq!(settings.port, 9090);
    }
}
