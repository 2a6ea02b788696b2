//! Audio plumbing shared by the recorder and the player.
//!
//! # Capture path
//!
//! ```text
//! Microphone → cpal callback → CaptureEvent (mpsc) → RecordingController
//!           → downmix_to_mono → resample → encode_wav → BlobRegistry
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use speak_practice::audio::{CaptureEvent, CpalMicrophone, Microphone};
//!
//! # async fn example() {
//! let stream = CpalMicrophone::new().open().await.unwrap();
//! while let Ok(CaptureEvent::Chunk(chunk)) = stream.events.recv() {
//!     println!("received {} samples @ {}Hz", chunk.samples.len(), chunk.sample_rate);
//! }
//! // dropping `stream.lease` stops the device
//! # }
//! ```

pub mod blob;
pub mod capture;
pub mod clock;
pub mod resample;
pub mod wav;

pub use blob::{is_blob_url, BlobEntry, BlobRegistry, BlobUrl};
pub use capture::{
    AudioChunk, CaptureEvent, CaptureStream, CpalMicrophone, DeviceLease, Microphone,
    MicrophoneError, StreamHandle,
};
pub use clock::{Clock, SystemClock};
pub use resample::{downmix_to_mono, resample};
pub use wav::{encode_wav, WAV_MEDIA_TYPE};

#[cfg(test)]
pub use capture::{MockFeed, MockMicrophone};
#[cfg(test)]
pub use clock::ManualClock;
