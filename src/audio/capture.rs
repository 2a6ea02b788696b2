//! Microphone capture via `cpal`.
//!
//! [`Microphone`] is the seam the recorder acquires its input through.
//! [`CpalMicrophone`] is the production implementation: opening it builds and
//! starts a cpal input stream and returns a [`CaptureStream`] whose
//! [`DeviceLease`] is a RAII guard.  Dropping the lease stops the hardware
//! stream and frees the device.

use std::sync::mpsc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioChunk / CaptureEvent
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

/// Everything the audio thread reports to the recorder.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Chunk(AudioChunk),
    /// The stream broke after it started (device unplugged, driver error).
    Failed(String),
}

// ---------------------------------------------------------------------------
// MicrophoneError
// ---------------------------------------------------------------------------

/// Why microphone access could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MicrophoneError {
    #[error("microphone access was denied: {0}")]
    PermissionDenied(String),

    #[error("no microphone was found")]
    DeviceNotFound,

    #[error("could not start the microphone: {0}")]
    Other(String),
}

impl From<cpal::DefaultStreamConfigError> for MicrophoneError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => MicrophoneError::DeviceNotFound,
            cpal::DefaultStreamConfigError::BackendSpecific { err } => classify_backend(&err),
            other => MicrophoneError::Other(other.to_string()),
        }
    }
}

impl From<cpal::BuildStreamError> for MicrophoneError {
    fn from(e: cpal::BuildStreamError) -> Self {
        match e {
            cpal::BuildStreamError::DeviceNotAvailable => MicrophoneError::DeviceNotFound,
            cpal::BuildStreamError::BackendSpecific { err } => classify_backend(&err),
            other => MicrophoneError::Other(other.to_string()),
        }
    }
}

impl From<cpal::PlayStreamError> for MicrophoneError {
    fn from(e: cpal::PlayStreamError) -> Self {
        match e {
            cpal::PlayStreamError::DeviceNotAvailable => MicrophoneError::DeviceNotFound,
            cpal::PlayStreamError::BackendSpecific { err } => classify_backend(&err),
        }
    }
}

/// Backends report permission problems only as free text.
fn classify_backend(err: &cpal::BackendSpecificError) -> MicrophoneError {
    let text = err.description.to_lowercase();
    if text.contains("permission") || text.contains("denied") || text.contains("not allowed") {
        MicrophoneError::PermissionDenied(err.description.clone())
    } else {
        MicrophoneError::Other(err.description.clone())
    }
}

// ---------------------------------------------------------------------------
// Microphone seam
// ---------------------------------------------------------------------------

/// Ownership token for an open input device.  Dropping it releases the
/// device.
pub trait DeviceLease {}

/// An open capture: the lease keeping the device alive plus the channel the
/// audio thread writes into.
pub struct CaptureStream {
    pub lease: Box<dyn DeviceLease>,
    pub events: mpsc::Receiver<CaptureEvent>,
}

/// Something that can hand out exclusive capture streams.
///
/// `open` suspends until the platform grants or refuses access.  cpal
/// streams are not `Send` on every platform, hence `?Send`.
#[async_trait(?Send)]
pub trait Microphone {
    async fn open(&self) -> Result<CaptureStream, MicrophoneError>;
}

// ---------------------------------------------------------------------------
// CpalMicrophone
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

impl DeviceLease for StreamHandle {}

/// The system default input device, opened through `cpal`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

impl CpalMicrophone {
    pub fn new() -> Self {
        Self
    }

    fn open_default(&self) -> Result<CaptureStream, MicrophoneError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(MicrophoneError::DeviceNotFound)?;

        let supported = device.default_input_config()?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let (tx, rx) = mpsc::channel();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, tx)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, tx)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, tx)?,
            other => {
                return Err(MicrophoneError::Other(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        };
        stream.play()?;

        log::info!(
            "microphone opened ({} Hz, {} ch, {:?})",
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        Ok(CaptureStream {
            lease: Box::new(StreamHandle { _stream: stream }),
            events: rx,
        })
    }
}

#[async_trait(?Send)]
impl Microphone for CpalMicrophone {
    async fn open(&self) -> Result<CaptureStream, MicrophoneError> {
        self.open_default()
    }
}

/// Build an input stream that converts every hardware buffer to `f32` and
/// forwards it as an [`AudioChunk`].  Send errors (recorder gone) are
/// ignored so the audio thread never panics.
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tx: mpsc::Sender<CaptureEvent>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;
    let err_tx = tx.clone();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let chunk = AudioChunk {
                samples: data.iter().map(|s| s.to_sample::<f32>()).collect(),
                sample_rate,
                channels,
            };
            let _ = tx.send(CaptureEvent::Chunk(chunk));
        },
        move |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
            let _ = err_tx.send(CaptureEvent::Failed(err.to_string()));
        },
        None,
    )
}

// ---------------------------------------------------------------------------
// MockMicrophone: test double
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{MockFeed, MockMicrophone};


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
