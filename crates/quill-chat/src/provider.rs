//! Generation provider clients.
//!
//! The orchestrator talks to a [`GenerationProvider`] trait object so the
//! concrete client is injected at startup and swapped for a mock in tests.
//! `GeminiProvider` wraps the Google Generative Language REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Text-in/text-out generation call scoped to a set of context chunks.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce an answer to `question` grounded in `context_chunks`.
    ///
    /// Any transport, provider, or shape failure surfaces as
    /// [`ChatError::Generation`]; implementations never retry.
    async fn generate(&self, context_chunks: &[String], question: &str)
        -> Result<String, ChatError>;
}

/// Build the grounding prompt from joined context and the user question.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions about the provided document.\n\
         Document context:\n{}\n\
         User question:\n{}\n\
         Provide a concise and accurate answer referencing the document.",
        context, question
    )
}

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

/// Gemini REST client. Constructed once at startup and shared.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiProvider {
    /// Create a client with an explicit request timeout.
    ///
    /// Fails immediately when no API key is configured so a misconfigured
    /// deployment is caught at startup rather than on the first chat.
    pub fn new(config: GeminiConfig) -> Result<Self, ChatError> {
        if config.api_key.is_empty() {
            return Err(ChatError::Generation(
                "Gemini API key is not configured".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChatError::Generation(e.to_string()))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn generate(
        &self,
        context_chunks: &[String],
        question: &str,
    ) -> Result<String, ChatError> {
        let prompt = build_prompt(&context_chunks.join("\n\n"), question);
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint, self.config.model
        );

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ChatError::Generation(format!("{} - {}", status, text)));
        }

        let data: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ChatError::Generation(e.to_string()))?;

        let parts: Vec<String> = data
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .filter(|t| !t.is_empty())
            .collect();

        if parts.is_empty() {
            return Err(ChatError::Generation(
                "model returned no text".to_string(),
            ));
        }

        Ok(parts.join("\n"))
    }
}

/// Canned provider for tests: returns a fixed answer or a fixed failure.
pub struct MockProvider {
    response: String,
    fail: bool,
}

impl MockProvider {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl GenerationProvider for MockProvider {
    async fn generate(
        &self,
        _context_chunks: &[String],
        _question: &str,
    ) -> Result<String, ChatError> {
        if self.fail {
            return Err(ChatError::Generation("mock provider failure".to_string()));
        }
        Ok(self.response.clone())
    }
}
