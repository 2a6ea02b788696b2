//! Feedback pipeline and practice flow.
//!
//! This module turns a finished recording into feedback and tracks the
//! learner's position in the five practice steps.
//!
//! # Architecture
//!
//! ```text
//! RecordingArtifact ─▶ Submission ──validate──▶ ValidatedSubmission
//!                                                   │
//!                                                   ▼
//!                        FeedbackPipeline::analyze_and_feedback()
//!                                                   │
//!                          ├─ GenerativeBackend::transcribe
//!                          └─ GenerativeBackend::generate → parse_feedback
//!                                                   │
//!                                                   ▼
//!                                FeedbackResult ─▶ PracticeSession (step 5)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use speak_practice::config::AppConfig;
//! use speak_practice::llm::GeminiClient;
//! use speak_practice::pipeline::{FeedbackPipeline, Submission, SubmissionHandler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let pipeline = FeedbackPipeline::new(Arc::new(GeminiClient::from_config(&config.gemini)));
//!     let handler = SubmissionHandler::new(pipeline, &config.submission);
//!
//!     let wav: Arc<[u8]> = std::fs::read("attempt.wav").unwrap().into();
//!     let result = handler
//!         .submit(Submission {
//!             audio: Some(wav),
//!             reference_text: Some("おはようございます".into()),
//!             self_assessment: Some("close".into()),
//!             ..Submission::default()
//!         })
//!         .await
//!         .unwrap();
//!     println!("{}", result.feedback.message);
//! }
//! ```

pub mod runner;
pub mod state;
pub mod submission;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{FeedbackPipeline, FeedbackResult, PipelineError};
pub use state::{Advance, PracticeSession, PracticeStep, StepError, SPEAK_PRACTICE_TARGET};
pub use submission::{Submission, SubmissionError, SubmissionHandler, ValidatedSubmission};
