//! Feedback pipeline: recording → transcription → advice.
//!
//! [`FeedbackPipeline`] owns no state between calls; every submission
//! re-runs both stages.
//!
//! # Pipeline flow
//!
//! ```text
//! analyze_and_feedback(audio, reference, assessment, language)
//!   └─▶ transcribe(audio)                    [fatal on error / empty]
//!         └─▶ generate_feedback(reference, transcription, …)
//!               ├─ Ok(raw)  → parse_feedback (field defaults)
//!               └─ Err      → warn + Feedback::fallback()
//! ```
//!
//! The two stages run strictly one after the other: feedback needs the
//! transcription as input.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Language;
use crate::llm::{parse_feedback, Feedback, GenerativeBackend, LlmError, PromptBuilder, SelfAssessment};

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// The only failures that abort a feedback request.  Generation problems
/// are absorbed into default feedback and never show up here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("speech analysis failed: transcription error: {0}")]
    Transcription(#[source] LlmError),

    #[error("speech analysis failed: transcription was empty")]
    EmptyTranscription,
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        "transcription"
    }
}

// ---------------------------------------------------------------------------
// FeedbackResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub transcription: String,
    pub feedback: Feedback,
}

// ---------------------------------------------------------------------------
// FeedbackPipeline
// ---------------------------------------------------------------------------

pub struct FeedbackPipeline {
    backend: Arc<dyn GenerativeBackend>,
}

impl FeedbackPipeline {
    pub fn new(backend: Arc<dyn GenerativeBackend>) -> Self {
        Self { backend }
    }

    /// Transcribe `audio`.  Errors and blank answers are fatal; the
    /// unintelligible marker is a valid transcription.
    pub async fn transcribe(&self, audio: &[u8], media_type: &str) -> Result<String, PipelineError> {
        let instruction = PromptBuilder::default().transcription_instruction();
        let text = self
            .backend
            .transcribe(audio, media_type, &instruction)
            .await
            .map_err(|e| {
                log::error!("pipeline: transcription failed: {e}");
                PipelineError::Transcription(e)
            })?;

        let text = text.trim();
        if text.is_empty() {
            log::error!("pipeline: transcription was empty");
            return Err(PipelineError::EmptyTranscription);
        }
        log::debug!("pipeline: transcription len={}", text.len());
        Ok(text.to_string())
    }

    /// Ask for advice on one attempt.  Never fails: a backend error or an
    /// unusable answer yields default feedback.
    pub async fn generate_feedback(
        &self,
        reference: &str,
        transcription: &str,
        assessment: SelfAssessment,
        language: Language,
    ) -> Feedback {
        let prompt = PromptBuilder::new(language).feedback_prompt(reference, transcription, assessment);
        match self.backend.generate(&prompt).await {
            Ok(raw) => parse_feedback(&raw),
            Err(e) => {
                log::warn!("pipeline: feedback generation failed, using defaults: {e}");
                Feedback::fallback()
            }
        }
    }

    /// [`transcribe`](Self::transcribe) then
    /// [`generate_feedback`](Self::generate_feedback).
    pub async fn analyze_and_feedback(
        &self,
        audio: &[u8],
        media_type: &str,
        reference: &str,
        assessment: SelfAssessment,
        language: Language,
    ) -> Result<FeedbackResult, PipelineError> {
        let transcription = self.transcribe(audio, media_type).await?;
        let feedback = self
            .generate_feedback(reference, &transcription, assessment, language)
            .await;
        Ok(FeedbackResult {
            transcription,
            feedback,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::llm::{ScriptedBackend, UNINTELLIGIBLE_MARKER};

    const GOOD_JSON: &str = r#"{"message":"伝わりましたよ！","goodPoints":["はっきり言えました"],"improvementTip":"「ございます」をゆっくり","encouragement":"がんばりましょう！"}"#;

    fn pipeline(backend: &Arc<ScriptedBackend>) -> FeedbackPipeline {
        FeedbackPipeline::new(Arc::clone(backend) as Arc<dyn GenerativeBackend>)
    }

    /// Transcribes fine, fails every generation call.
    struct GenerationDown;

    #[async_trait]
    impl GenerativeBackend for GenerationDown {
        async fn transcribe(&self, _: &[u8], _: &str, _: &str) -> Result<String, LlmError> {
            Ok("おはよう".into())
        }

        async fn generate(&self, _: &str) -> Result<String, LlmError> {
            Err(LlmError::Timeout)
        }
    }

    #[tokio::test]
    async fn prompt_carries_reference_transcription_and_assessment() {
        let backend = Arc::new(ScriptedBackend::new("おはようございます", GOOD_JSON));
        let result = pipeline(&backend)
            .analyze_and_feedback(b"RIFF", "audio/wav", "おはようございます", SelfAssessment::Close, Language::Ja)
            .await
            .unwrap();

        assert_eq!(result.transcription, "おはようございます");
        assert_eq!(result.feedback.good_points, vec!["はっきり言えました"]);

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("お手本テキスト: おはようございます"));
        assert!(prompts[0].contains("学生の発音（音声認識結果）: おはようございます"));
        assert!(prompts[0].contains(SelfAssessment::Close.description()));
    }

    #[tokio::test]
    async fn transcription_failure_skips_generation() {
        let backend = Arc::new(ScriptedBackend::failing_transcription("connection reset"));
        let err = pipeline(&backend)
            .analyze_and_feedback(b"RIFF", "audio/wav", "おはよう", SelfAssessment::Same, Language::En)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Transcription(_)));
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(backend.transcribe_calls(), 1);
        assert_eq!(backend.generate_calls(), 0);
    }

    #[tokio::test]
    async fn blank_transcription_is_fatal() {
        let backend = Arc::new(ScriptedBackend::new("  \n", GOOD_JSON));
        let err = pipeline(&backend)
            .transcribe(b"RIFF", "audio/wav")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTranscription));
        assert_eq!(err.kind(), "transcription");
    }

    #[tokio::test]
    async fn unintelligible_marker_still_gets_feedback() {
        let backend = Arc::new(ScriptedBackend::new(UNINTELLIGIBLE_MARKER, GOOD_JSON));
        let result = pipeline(&backend)
            .analyze_and_feedback(b"RIFF", "audio/wav", "おはよう", SelfAssessment::Unknown, Language::Ja)
            .await
            .unwrap();
        assert_eq!(result.transcription, UNINTELLIGIBLE_MARKER);
        assert_eq!(backend.generate_calls(), 1);
    }

    #[tokio::test]
    async fn malformed_generation_uses_defaults() {
        let backend = Arc::new(ScriptedBackend::new("おはよう", "I cannot help with that"));
        let feedback = pipeline(&backend)
            .generate_feedback("おはよう", "おはよう", SelfAssessment::Difficult, Language::Vi)
            .await;
        assert_eq!(feedback, Feedback::fallback());
        assert!(backend.prompts()[0].contains("ベトナム語"));
    }

    #[tokio::test]
    async fn generation_error_is_absorbed() {
        let pipeline = FeedbackPipeline::new(Arc::new(GenerationDown));
        let result = pipeline
            .analyze_and_feedback(b"RIFF", "audio/wav", "おはよう", SelfAssessment::Same, Language::Ja)
            .await
            .unwrap();
        assert_eq!(result.transcription, "おはよう");
        assert_eq!(result.feedback, Feedback::fallback());
    }

    #[tokio::test]
    async fn repeated_calls_are_independent() {
        let backend = Arc::new(ScriptedBackend::new("おはよう", GOOD_JSON));
        let pipeline = pipeline(&backend);
        for _ in 0..3 {
            pipeline
                .analyze_and_feedback(b"RIFF", "audio/wav", "おはよう", SelfAssessment::Same, Language::Ja)
                .await
                .unwrap();
        }
        assert_eq!(backend.transcribe_calls(), 3);
        assert_eq!(backend.generate_calls(), 3);
    }
}
