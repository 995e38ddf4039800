//! OpenAI-compatible completions adapter.
//!
//! Talks to a vLLM-style `/v1/completions` endpoint over blocking
//! HTTP. Wall-clock latency is measured client-side; anything the
//! server's `usage` block does not report stays `None`; the
//! aggregator treats absence and zero differently.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;

use ctxbench_core::{size_estimate, Backend, CtxError, CtxResult, GenerationRequest, StepMetrics};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct HttpBackend {
    url: String,
    model: String,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>, model: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .build();
        Self {
            url: url.into(),
            model: model.into(),
            agent,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/completions", self.url.trim_end_matches('/'))
    }
}

impl Backend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn generate(&self, request: &GenerationRequest<'_>) -> CtxResult<(String, StepMetrics)> {
        let body = CompletionRequest {
            model: &self.model,
            prompt: request.prompt,
            max_tokens: request.max_output_size,
            temperature: request.temperature,
        };

        let start = Instant::now();
        let response = self
            .agent
            .post(&self.endpoint())
            .send_json(
                serde_json::to_value(&body).map_err(|e| CtxError::Generation(e.to_string()))?,
            )
            .map_err(|e| CtxError::Generation(format!("{} POST failed: {e}", self.endpoint())))?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        let parsed: CompletionResponse = response
            .into_json()
            .map_err(|e| CtxError::Generation(format!("invalid completions response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .unwrap_or_default();

        let usage = parsed.usage.unwrap_or_default();
        let output_size = usage.completion_tokens.unwrap_or_else(|| size_estimate(&text));

        debug!(
            step = request.step.as_str(),
            latency_ms, output_size, "completions call finished"
        );

        let metrics = StepMetrics {
            output_size,
            latency_ms,
            // Standard completions endpoints expose none of these;
            // vLLM builds that do fill them via usage extensions.
            prefill_ms: None,
            decode_ms: None,
            computed_input_size: usage.prompt_tokens,
            reused_size: usage.cached_tokens,
            energy_joules: None,
        };
        Ok((text, metrics))
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u64,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u64>,
    #[serde(default)]
    completion_tokens: Option<u64>,
    /// vLLM prefix-cache extension; absent on stock servers.
    #[serde(default)]
    cached_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        let a = HttpBackend::new("http://localhost:8000/", "m");
        let b = HttpBackend::new("http://localhost:8000", "m");
        assert_eq!(a.endpoint(), "http://localhost:8000/v1/completions");
        assert_eq!(a.endpoint(), b.endpoint());
    }

    #[test]
    fn test_response_parsing_without_usage() {
        let json = r#"{"choices": [{"text": "hello"}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].text, "hello");
    }

    #[test]
    fn test_response_parsing_with_partial_usage() {
        let json = r#"{"choices": [{"text": "hi"}],
                       "usage": {"prompt_tokens": 12, "completion_tokens": 3}}"#;
        let parsed: CompletionResponse = serde_json::from_str(json).unwrap();
        let usage = parsed.usage.unwrap();
        assert_eq!(usage.prompt_tokens, Some(12));
        assert_eq!(usage.completion_tokens, Some(3));
        assert_eq!(usage.cached_tokens, None);
    }
}
