//! Pronunciation practice for short Japanese phrases.
//!
//! A learner listens to a reference clip, records their own attempt and
//! gets a transcription plus written feedback from a generative model.
//!
//! * [`player`]: reference and recording playback with a playthrough counter.
//! * [`recorder`]: microphone capture into a WAV artifact.
//! * [`pipeline`]: transcription, feedback and the five-step session.
//! * [`catalog`] / [`store`]: lessons, progress and preferences.

pub mod audio;
pub mod catalog;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod player;
pub mod recorder;
pub mod store;
