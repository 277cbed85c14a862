//! Best-effort structured data extraction from free-text model output
//!
//! Models tend to wrap JSON in prose or code fences. Rather than a full
//! grammar, the outermost candidate span is located (first opening
//! delimiter through last closing delimiter) and only that substring is
//! handed to `serde_json`.

use serde_json::Value;
use thiserror::Error;

/// Why a span could not be turned into JSON
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No opening delimiter, no closing delimiter, or the closing one comes first
    #[error("no {open}...{close} span found")]
    NoSpan { open: char, close: char },

    /// A span was found but is not valid JSON
    #[error("span is not valid JSON: {source}")]
    InvalidJson {
        span: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Substring from the first `open` through the last `close`, inclusive.
pub fn delimited_span(raw: &str, open: char, close: char) -> Option<&str> {
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&raw[start..end + close.len_utf8()])
}

fn extract_span(raw: &str, open: char, close: char) -> Result<Value, ExtractionError> {
    let span = delimited_span(raw, open, close).ok_or(ExtractionError::NoSpan { open, close })?;
    serde_json::from_str(span).map_err(|source| ExtractionError::InvalidJson {
        span: span.to_string(),
        source,
    })
}

/// Parse the outermost `{...}` span of `raw`.
pub fn extract_json_object(raw: &str) -> Result<Value, ExtractionError> {
    extract_span(raw, '{', '}')
}

/// Parse the outermost `[...]` span of `raw`.
pub fn extract_json_array(raw: &str) -> Result<Value, ExtractionError> {
    extract_span(raw, '[', ']')
}

/// Tags from a model response, or why there are none.
///
/// String elements are trimmed and kept; numbers and booleans keep their JSON
/// text; nulls, objects, nested arrays and blank strings are dropped.
pub fn try_parse_tags(raw: &str) -> Result<Vec<String>, ExtractionError> {
    let value = extract_json_array(raw)?;
    let Value::Array(items) = value else {
        // unreachable for a `[...]` span
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
        .filter(|tag| !tag.is_empty())
        .collect())
}

/// Tolerant tag extraction: any failure yields an empty list.
pub fn parse_tags(raw: &str) -> Vec<String> {
    try_parse_tags(raw).unwrap_or_default()
}
