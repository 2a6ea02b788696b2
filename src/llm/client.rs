//! Core `GenerativeBackend` trait and the Gemini implementation.
//!
//! The feedback pipeline needs two capabilities from a generative model:
//! audio-in/text-out transcription and text-in/text-out generation.
//! [`GeminiClient`] provides both through the `generateContent` REST
//! endpoint.  All connection details come from [`GeminiConfig`].

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeminiConfig;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors from a generative backend call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("generative backend timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("generative backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse backend response: {0}")]
    Parse(String),

    /// The backend returned a response with no usable text content.
    #[error("generative backend returned an empty response")]
    EmptyResponse,

    #[error("no API key configured (set it in settings.toml or $GEMINI_API_KEY)")]
    MissingApiKey,
}

impl LlmError {
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Request(_) => "request",
            LlmError::Timeout => "timeout",
            LlmError::Status { .. } => "status",
            LlmError::Parse(_) => "parse",
            LlmError::EmptyResponse => "empty-response",
            LlmError::MissingApiKey => "missing-api-key",
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// GenerativeBackend trait
// ---------------------------------------------------------------------------

/// The two calls the feedback pipeline makes.
///
/// Implementors must be `Send + Sync` so they can be shared behind
/// `Arc<dyn GenerativeBackend>`.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Transcribe `audio` (encoded as `media_type`) following `instruction`.
    async fn transcribe(
        &self,
        audio: &[u8],
        media_type: &str,
        instruction: &str,
    ) -> Result<String, LlmError>;

    /// Complete a text prompt.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

const MAX_OUTPUT_TOKENS: u32 = 1024;

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Calls `{base_url}/v1beta/models/{model}:generateContent`.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
    api_key: Option<String>,
}

impl GeminiClient {
    /// Build a client from application config.  The HTTP client carries the
    /// per-request timeout from `config.timeout_secs`.
    pub fn from_config(config: &GeminiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: config.resolved_api_key(),
            config: config.clone(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_content(&self, parts: Vec<Part<'_>>) -> Result<String, LlmError> {
        let key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let body = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn transcribe(
        &self,
        audio: &[u8],
        media_type: &str,
        instruction: &str,
    ) -> Result<String, LlmError> {
        log::debug!("gemini: transcribe {} bytes of {media_type}", audio.len());
        let data = base64::engine::general_purpose::STANDARD.encode(audio);
        self.generate_content(vec![
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: media_type,
                    data,
                },
            },
            Part::Text { text: instruction },
        ])
        .await
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        log::debug!("gemini: generate (prompt len={})", prompt.len());
        self.generate_content(vec![Part::Text { text: prompt }]).await
    }
}

// ---------------------------------------------------------------------------
// ScriptedBackend: test double
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use scripted::ScriptedBackend;

#[cfg(test)]
mod scripted {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Returns canned answers and records every call.
    pub struct ScriptedBackend {
        transcription: Result<String, String>,
        generation: String,
        transcribe_calls: AtomicUsize,
        generate_calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        pub fn new(transcription: &str, generation: &str) -> Self {
            Self {
                transcription: Ok(transcription.to_string()),
                generation: generation.to_string(),
                transcribe_calls: AtomicUsize::new(0),
                generate_calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Transcription fails with a transport error.
        pub fn failing_transcription(reason: &str) -> Self {
            Self {
                transcription: Err(reason.to_string()),
                ..Self::new("", "")
            }
        }

        pub fn transcribe_calls(&self) -> usize {
            self.transcribe_calls.load(Ordering::SeqCst)
        }

        pub fn generate_calls(&self) -> usize {
            self.generate_calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn transcribe(&self, _: &[u8], _: &str, _: &str) -> Result<String, LlmError> {
            self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
            self.transcription.clone().map_err(LlmError::Request)
        }

        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.generation.clone())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
