//! Microphone recording for the practice step.
//!
//! [`RecordingController`] owns one capture at a time: it acquires the
//! microphone through the [`Microphone`](crate::audio::Microphone) seam,
//! tracks pause-aware elapsed time, auto-stops at the configured maximum and
//! finalizes the audio into a WAV [`RecordingArtifact`] with a playable
//! `blob:` URL.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use speak_practice::audio::{BlobRegistry, CpalMicrophone};
//! use speak_practice::config::RecordingConfig;
//! use speak_practice::recorder::{RecordingController, RecordingState};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let blobs = BlobRegistry::new();
//!     let mut recorder =
//!         RecordingController::new(CpalMicrophone::new(), blobs, &RecordingConfig::default());
//!
//!     recorder.start_recording().await.unwrap();
//!     while recorder.state() == RecordingState::Recording {
//!         tokio::time::sleep(recorder.tick_interval()).await;
//!         recorder.tick();
//!     }
//!     println!("{:?}", recorder.artifact().map(|a| a.duration));
//!     recorder.clear_recording();
//! }
//! ```

pub mod controller;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{RecorderError, RecordingArtifact, RecordingController, RecordingState};
