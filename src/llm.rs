//! Generative-text adapter for an Ollama-style HTTP API.
//!
//! One operation: send a composed prompt, get text back or nothing. Every
//! failure mode (non-200 status, timeout, transport error, malformed body)
//! collapses to `None` with a logged error. No retry, no backoff, no state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const GENERATE_TIMEOUT: Duration = Duration::from_secs(60);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Preamble prefixed to every prompt. Keeps the model from leaking its
/// reasoning into replies relayed verbatim to chat.
const SYSTEM_PROMPT: &str = "You are a direct response assistant. ONLY provide the final answer \
without any internal thinking, reasoning, or monologue. Do not include any phrases like \
'thinking', 'analysis', or 'I think'. Format your final answer as bullet points with each item \
preceded by an emoji (e.g., 🔹). Return only the final answer.";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f64,
    top_p: f64,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for the generative-text service.
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Startup-only connectivity check against the service's tag listing.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.http.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::error!(%error, "generative service probe failed");
                false
            }
        }
    }

    /// Generate a response for the given prompt, or `None` on any failure.
    pub async fn generate(&self, prompt: &str) -> Option<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: format!("{SYSTEM_PROMPT}\n\nUser Request: {prompt}\n\nDirect Response:"),
            stream: false,
            options: SamplingOptions {
                temperature: 0.7,
                top_p: 0.9,
                num_predict: 256,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        let response = match self
            .http
            .post(&url)
            .timeout(GENERATE_TIMEOUT)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(%error, "generative request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "generative service returned an error");
            return None;
        }

        match response.json::<GenerateResponse>().await {
            Ok(body) => {
                let text = body.response.trim().to_string();
                if text.is_empty() { None } else { Some(text) }
            }
            Err(error) => {
                tracing::error!(%error, "failed to decode generative response");
                None
            }
        }
    }
}
