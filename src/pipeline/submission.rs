//! Entry point for feedback requests coming from a UI.
//!
//! A [`Submission`] carries loosely-typed fields exactly as a form would
//! deliver them.  [`SubmissionHandler::submit`] validates them in a fixed
//! order (audio, reference text, self-assessment, size, language) and only
//! then runs the [`FeedbackPipeline`].  A rejected submission never reaches
//! the network.

use std::sync::Arc;

use thiserror::Error;

use super::runner::{FeedbackPipeline, FeedbackResult, PipelineError};
use crate::audio::WAV_MEDIA_TYPE;
use crate::catalog::Language;
use crate::config::SubmissionConfig;
use crate::llm::SelfAssessment;
use crate::recorder::RecordingArtifact;

// ---------------------------------------------------------------------------
// SubmissionError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("no audio was submitted")]
    MissingAudio,

    #[error("no reference text was submitted")]
    MissingReferenceText,

    #[error("no self-assessment was submitted")]
    MissingSelfAssessment,

    #[error("invalid self-assessment {0:?}; expected same, close, difficult or unknown")]
    InvalidSelfAssessment(String),

    #[error("audio is too large ({size} bytes, limit {limit})")]
    AudioTooLarge { size: usize, limit: usize },

    #[error("unsupported language {0:?}")]
    InvalidLanguage(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl SubmissionError {
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionError::MissingAudio => "missing-audio",
            SubmissionError::MissingReferenceText => "missing-reference-text",
            SubmissionError::MissingSelfAssessment => "missing-self-assessment",
            SubmissionError::InvalidSelfAssessment(_) => "invalid-self-assessment",
            SubmissionError::AudioTooLarge { .. } => "audio-too-large",
            SubmissionError::InvalidLanguage(_) => "invalid-language",
            SubmissionError::Pipeline(e) => e.kind(),
        }
    }

    /// `true` for input problems the user can fix by changing the request.
    pub fn is_validation(&self) -> bool {
        !matches!(self, SubmissionError::Pipeline(_))
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// A feedback request as received.  Empty strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub audio: Option<Arc<[u8]>>,
    /// Defaults to WAV when empty.
    pub media_type: String,
    pub reference_text: Option<String>,
    pub self_assessment: Option<String>,
    /// Defaults to Japanese when absent.
    pub user_language: Option<String>,
}

impl Submission {
    /// A request for a finished recording.
    pub fn from_recording(
        artifact: &RecordingArtifact,
        reference_text: &str,
        self_assessment: SelfAssessment,
        language: Language,
    ) -> Self {
        Self {
            audio: Some(Arc::clone(&artifact.bytes)),
            media_type: artifact.media_type.to_string(),
            reference_text: Some(reference_text.to_string()),
            self_assessment: Some(self_assessment.code().to_string()),
            user_language: Some(language.code().to_string()),
        }
    }

    /// Check every field and convert to typed values.
    pub fn validate(self, max_audio_bytes: usize) -> Result<ValidatedSubmission, SubmissionError> {
        let audio = self
            .audio
            .filter(|a| !a.is_empty())
            .ok_or(SubmissionError::MissingAudio)?;

        let reference_text = self
            .reference_text
            .filter(|t| !t.trim().is_empty())
            .ok_or(SubmissionError::MissingReferenceText)?;

        let raw_assessment = self
            .self_assessment
            .filter(|s| !s.is_empty())
            .ok_or(SubmissionError::MissingSelfAssessment)?;
        let self_assessment = raw_assessment
            .parse::<SelfAssessment>()
            .map_err(|e| SubmissionError::InvalidSelfAssessment(e.0))?;

        if audio.len() > max_audio_bytes {
            return Err(SubmissionError::AudioTooLarge {
                size: audio.len(),
                limit: max_audio_bytes,
            });
        }

        let language = match self.user_language.as_deref() {
            None | Some("") => Language::default(),
            Some(code) => code
                .parse::<Language>()
                .map_err(|e| SubmissionError::InvalidLanguage(e.0))?,
        };

        let media_type = if self.media_type.is_empty() {
            WAV_MEDIA_TYPE.to_string()
        } else {
            self.media_type
        };

        Ok(ValidatedSubmission {
            audio,
            media_type,
            reference_text,
            self_assessment,
            language,
        })
    }
}

/// A submission whose fields are all present and typed.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub audio: Arc<[u8]>,
    pub media_type: String,
    pub reference_text: String,
    pub self_assessment: SelfAssessment,
    pub language: Language,
}

// ---------------------------------------------------------------------------
// SubmissionHandler
// ---------------------------------------------------------------------------

pub struct SubmissionHandler {
    pipeline: FeedbackPipeline,
    max_audio_bytes: usize,
}

impl SubmissionHandler {
    pub fn new(pipeline: FeedbackPipeline, config: &SubmissionConfig) -> Self {
        Self {
            pipeline,
            max_audio_bytes: config.max_audio_bytes,
        }
    }

    /// Validate, then run the pipeline.
    pub async fn submit(&self, submission: Submission) -> Result<FeedbackResult, SubmissionError> {
        let request = submission.validate(self.max_audio_bytes).map_err(|e| {
            log::warn!("submission rejected: {e}");
            e
        })?;

        log::info!(
            "submission: {} bytes, assessment={}, language={}",
            request.audio.len(),
            request.self_assessment,
            request.language
        );

        let result = self
            .pipeline
            .analyze_and_feedback(
                &request.audio,
                &request.media_type,
                &request.reference_text,
                request.self_assessment,
                request.language,
            )
            .await?;
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
