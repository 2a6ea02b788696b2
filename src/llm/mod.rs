//! Generative-model access for the feedback pipeline.
//!
//! This module provides:
//! * [`GenerativeBackend`]: async trait for transcription and generation.
//! * [`GeminiClient`]: Google Gemini `generateContent` implementation.
//! * [`PromptBuilder`]: transcription and feedback instructions.
//! * [`SelfAssessment`]: the learner's closed-set rating of an attempt.
//! * [`Feedback`] / [`parse_feedback`]: tolerant parsing of model output.
//! * [`LlmError`]: error variants for backend calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use speak_practice::catalog::Language;
//! use speak_practice::config::AppConfig;
//! use speak_practice::llm::{parse_feedback, GeminiClient, GenerativeBackend, PromptBuilder, SelfAssessment};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let client = GeminiClient::from_config(&config.gemini);
//!     let prompts = PromptBuilder::new(Language::En);
//!
//!     let prompt = prompts.feedback_prompt("おはようございます", "おはようございます", SelfAssessment::Same);
//!     let raw = client.generate(&prompt).await.unwrap();
//!     println!("{:?}", parse_feedback(&raw));
//! }
//! ```

pub mod client;
pub mod feedback;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{GeminiClient, GenerativeBackend, LlmError};
pub use feedback::{
    extract_json_object, parse_feedback, Feedback, DEFAULT_ENCOURAGEMENT, DEFAULT_MESSAGE,
};
pub use prompt::{PromptBuilder, SelfAssessment, UnknownSelfAssessment, UNINTELLIGIBLE_MARKER};

#[cfg(test)]
pub use client::ScriptedBackend;
