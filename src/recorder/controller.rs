//! Recording state machine.
//!
//! ```text
//! Idle ──start_recording──▶ Recording ◀──resume── Paused
//!                            │    └──pause──────────▲
//!                            │ stop / max duration reached
//!                            ▼
//!                          Stopped ──clear_recording──▶ Idle
//!
//! mic denied / missing ──▶ Idle (+ error)
//! capture failure mid-recording ──▶ Idle (+ error, no artifact)
//! ```
//!
//! Elapsed time is derived from wall-clock instants: `started_at` is shifted
//! forward on resume by the time spent paused, so `now - started_at` is
//! always the recorded (unpaused) time.  [`RecordingController::tick`] samples
//! it for display and enforces the maximum duration.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::audio::{
    downmix_to_mono, encode_wav, resample, BlobRegistry, BlobUrl, CaptureEvent, CaptureStream,
    Clock, Microphone, MicrophoneError, SystemClock, WAV_MEDIA_TYPE,
};
use crate::config::RecordingConfig;

// ---------------------------------------------------------------------------
// RecordingState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    #[default]
    Idle,
    Recording,
    Paused,
    Stopped,
}

impl RecordingState {
    /// `true` while the microphone is held.
    pub fn is_capturing(&self) -> bool {
        matches!(self, RecordingState::Recording | RecordingState::Paused)
    }
}

// ---------------------------------------------------------------------------
// RecorderError
// ---------------------------------------------------------------------------

/// Recorder failures, classified so a UI can give specific guidance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("microphone access was denied; enable microphone permission and try again")]
    PermissionDenied(String),

    #[error("no microphone was found; check that one is connected")]
    DeviceNotFound,

    #[error("could not start recording: {0}")]
    Other(String),

    #[error("recording failed: {0}")]
    CaptureFailed(String),

    #[error("could not finalize the recording: {0}")]
    Finalize(String),
}

impl RecorderError {
    /// Stable class name for UI guidance.
    pub fn kind(&self) -> &'static str {
        match self {
            RecorderError::PermissionDenied(_) => "permission-denied",
            RecorderError::DeviceNotFound => "device-not-found",
            RecorderError::Other(_) => "other",
            RecorderError::CaptureFailed(_) => "capture-failed",
            RecorderError::Finalize(_) => "finalize-failed",
        }
    }
}

impl From<MicrophoneError> for RecorderError {
    fn from(e: MicrophoneError) -> Self {
        match e {
            MicrophoneError::PermissionDenied(detail) => RecorderError::PermissionDenied(detail),
            MicrophoneError::DeviceNotFound => RecorderError::DeviceNotFound,
            MicrophoneError::Other(detail) => RecorderError::Other(detail),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingArtifact
// ---------------------------------------------------------------------------

/// The finalized recording: immutable WAV bytes plus a playable URL.
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    pub bytes: Arc<[u8]>,
    pub media_type: &'static str,
    pub url: BlobUrl,
    /// Recorded time, excluding pauses, never above the maximum duration.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// RecordingController
// ---------------------------------------------------------------------------

/// Owns one microphone recording from start to cleared.
pub struct RecordingController<M: Microphone, C: Clock = SystemClock> {
    microphone: M,
    clock: C,
    blobs: BlobRegistry,
    max_duration: Duration,
    tick_interval: Duration,
    target_rate: u32,

    state: RecordingState,
    stream: Option<CaptureStream>,
    /// Start instant shifted by accumulated pause time.
    started_at: Option<Instant>,
    /// Frozen elapsed time while paused or after stopping.
    frozen: Duration,
    samples: Vec<f32>,
    source_rate: u32,
    artifact: Option<RecordingArtifact>,
    error: Option<RecorderError>,
}

impl<M: Microphone> RecordingController<M, SystemClock> {
    pub fn new(microphone: M, blobs: BlobRegistry, config: &RecordingConfig) -> Self {
        Self::with_clock(microphone, blobs, config, SystemClock)
    }
}

impl<M: Microphone, C: Clock> RecordingController<M, C> {
    pub fn with_clock(microphone: M, blobs: BlobRegistry, config: &RecordingConfig, clock: C) -> Self {
        Self {
            microphone,
            clock,
            blobs,
            max_duration: Duration::from_secs(u64::from(config.max_duration_secs)),
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            target_rate: config.target_sample_rate,
            state: RecordingState::Idle,
            stream: None,
            started_at: None,
            frozen: Duration::ZERO,
            samples: Vec::new(),
            source_rate: 0,
            artifact: None,
            error: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Whole seconds recorded so far (paused time excluded).
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed().as_secs()
    }

    pub fn elapsed(&self) -> Duration {
        match (self.state, self.started_at) {
            (RecordingState::Recording, Some(start)) => self.clock.now().saturating_duration_since(start),
            _ => self.frozen,
        }
    }

    pub fn artifact(&self) -> Option<&RecordingArtifact> {
        self.artifact.as_ref()
    }

    pub fn error(&self) -> Option<&RecorderError> {
        self.error.as_ref()
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// How often the owner should call [`tick`](Self::tick).
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Acquire the microphone and begin capturing.
    ///
    /// Only valid from `Idle`; a finished recording must be cleared first.
    /// On failure the controller stays `Idle` with [`error`](Self::error)
    /// set to the classified cause, and no device handle is kept.
    pub async fn start_recording(&mut self) -> Result<(), RecorderError> {
        if self.state != RecordingState::Idle {
            log::debug!("recorder: start ignored in {:?}", self.state);
            return Ok(());
        }

        self.error = None;
        self.samples.clear();
        self.source_rate = 0;

        match self.microphone.open().await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.started_at = Some(self.clock.now());
                self.frozen = Duration::ZERO;
                self.state = RecordingState::Recording;
                log::debug!("recorder: Idle → Recording");
                Ok(())
            }
            Err(e) => {
                let err = RecorderError::from(e);
                log::warn!("recorder: microphone unavailable: {err}");
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn pause_recording(&mut self) {
        if self.state != RecordingState::Recording {
            return;
        }
        if !self.collect(true) {
            return;
        }
        self.frozen = self.elapsed();
        self.state = RecordingState::Paused;
        log::debug!("recorder: Recording → Paused at {:?}", self.frozen);
    }

    pub fn resume_recording(&mut self) {
        if self.state != RecordingState::Paused {
            return;
        }
        // Audio that arrived while paused is not part of the recording.
        if !self.collect(false) {
            return;
        }
        self.started_at = Some(self.clock.now() - self.frozen);
        self.state = RecordingState::Recording;
        log::debug!("recorder: Paused → Recording");
    }

    /// Finish the recording: release the microphone and build the artifact.
    ///
    /// No-op in `Idle` and `Stopped`.
    pub fn stop_recording(&mut self) {
        let keep = match self.state {
            RecordingState::Recording => true,
            RecordingState::Paused => false,
            RecordingState::Idle | RecordingState::Stopped => return,
        };
        if !self.collect(keep) {
            return;
        }

        let elapsed = self.elapsed().min(self.max_duration);
        self.release_device();
        self.frozen = elapsed;
        self.started_at = None;

        match self.finalize(elapsed) {
            Ok(artifact) => {
                log::info!(
                    "recorder: stopped after {:.1}s ({} bytes)",
                    elapsed.as_secs_f32(),
                    artifact.bytes.len()
                );
                self.artifact = Some(artifact);
                self.state = RecordingState::Stopped;
            }
            Err(err) => {
                log::warn!("recorder: {err}");
                self.samples.clear();
                self.frozen = Duration::ZERO;
                self.error = Some(err);
                self.state = RecordingState::Idle;
            }
        }
    }

    /// Drop everything and return to `Idle`.  Safe from any state; the
    /// artifact URL is revoked at most once.
    pub fn clear_recording(&mut self) {
        self.release_device();
        if let Some(artifact) = self.artifact.take() {
            self.blobs.revoke(&artifact.url);
        }
        self.samples = Vec::new();
        self.source_rate = 0;
        self.started_at = None;
        self.frozen = Duration::ZERO;
        self.error = None;
        if self.state != RecordingState::Idle {
            log::debug!("recorder: {:?} → Idle (cleared)", self.state);
        }
        self.state = RecordingState::Idle;
    }

    /// Pull pending audio and enforce the maximum duration.  Call every
    /// [`tick_interval`](Self::tick_interval) while recording.
    pub fn tick(&mut self) {
        if self.state != RecordingState::Recording {
            return;
        }
        if !self.collect(true) {
            return;
        }
        if self.elapsed() >= self.max_duration {
            log::info!("recorder: reached {}s limit, stopping", self.max_duration.as_secs());
            self.stop_recording();
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Drain the capture channel, keeping or discarding the audio.  Returns
    /// `false` when the stream reported a failure (the controller is then
    /// back in `Idle`).
    fn collect(&mut self, keep: bool) -> bool {
        let Some(stream) = self.stream.as_ref() else {
            return true;
        };

        let mut failure = None;
        while let Ok(event) = stream.events.try_recv() {
            match event {
                CaptureEvent::Chunk(chunk) if keep => {
                    if self.source_rate == 0 {
                        self.source_rate = chunk.sample_rate;
                    }
                    self.samples
                        .extend(downmix_to_mono(&chunk.samples, chunk.channels));
                }
                CaptureEvent::Chunk(_) => {}
                CaptureEvent::Failed(reason) => {
                    failure = Some(reason);
                    break;
                }
            }
        }

        match failure {
            Some(reason) => {
                self.fail_capture(reason);
                false
            }
            None => true,
        }
    }

    fn fail_capture(&mut self, reason: String) {
        log::warn!("recorder: capture failed in {:?}: {reason}", self.state);
        self.release_device();
        self.samples.clear();
        self.started_at = None;
        self.frozen = Duration::ZERO;
        self.error = Some(RecorderError::CaptureFailed(reason));
        self.state = RecordingState::Idle;
    }

    fn release_device(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("recorder: microphone released");
        }
    }

    fn finalize(&mut self, elapsed: Duration) -> Result<RecordingArtifact, RecorderError> {
        let mut samples = std::mem::take(&mut self.samples);
        let source_rate = if self.source_rate == 0 {
            self.target_rate
        } else {
            self.source_rate
        };

        let limit = (self.max_duration.as_secs_f64() * f64::from(source_rate)).round() as usize;
        samples.truncate(limit);

        let mut mono = resample(&samples, source_rate, self.target_rate);
        let target_limit =
            (self.max_duration.as_secs_f64() * f64::from(self.target_rate)).round() as usize;
        mono.truncate(target_limit);

        let bytes: Arc<[u8]> = encode_wav(&mono, self.target_rate)
            .map_err(|e| RecorderError::Finalize(e.to_string()))?
            .into();
        let url = self.blobs.register(Arc::clone(&bytes), WAV_MEDIA_TYPE);

        Ok(RecordingArtifact {
            bytes,
            media_type: WAV_MEDIA_TYPE,
            url,
            duration: elapsed,
        })
    }
}

impl<M: Microphone, C: Clock> Drop for RecordingController<M, C> {
    fn drop(&mut self) {
        self.clear_recording();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::audio::{ManualClock, MockMicrophone};

    const RATE: u32 = 16_000;

    fn config(max_secs: u32) -> RecordingConfig {
        RecordingConfig {
            max_duration_secs: max_secs,
            ..RecordingConfig::default()
        }
    }

    fn controller(
        mic: MockMicrophone,
        max_secs: u32,
    ) -> (RecordingController<MockMicrophone, ManualClock>, ManualClock, BlobRegistry) {
        let clock = ManualClock::new();
        let blobs = BlobRegistry::new();
        let rec = RecordingController::with_clock(mic, blobs.clone(), &config(max_secs), clock.clone());
        (rec, clock, blobs)
    }

    /// Advance the clock and deliver the matching amount of audio.
    fn record_for(rec: &RecordingController<MockMicrophone, ManualClock>, clock: &ManualClock, secs: f32) {
        rec.microphone.feed().push_secs(secs, RATE);
        clock.advance(Duration::from_secs_f32(secs));
    }

    fn wav_len(artifact: &RecordingArtifact) -> u32 {
        hound::WavReader::new(Cursor::new(artifact.bytes.to_vec()))
            .unwrap()
            .duration()
    }

    #[tokio::test]
    async fn start_enters_recording() {
        let (mut rec, _clock, _) = controller(MockMicrophone::granting(), 30);
        rec.start_recording().await.unwrap();
        assert_eq!(rec.state(), RecordingState::Recording);
        assert_eq!(rec.microphone.opened(), 1);
        assert!(rec.error().is_none());
    }

    #[tokio::test]
    async fn pause_resume_excludes_paused_time() {
        let (mut rec, clock, _) = controller(MockMicrophone::granting(), 30);
        rec.start_recording().await.unwrap();

        record_for(&rec, &clock, 2.0);
        rec.pause_recording();
        assert_eq!(rec.state(), RecordingState::Paused);

        record_for(&rec, &clock, 5.0);
        assert_eq!(rec.elapsed_seconds(), 2, "frozen while paused");

        rec.resume_recording();
        record_for(&rec, &clock, 1.0);
        rec.stop_recording();

        assert_eq!(rec.state(), RecordingState::Stopped);
        assert_eq!(rec.elapsed_seconds(), 3);
        let artifact = rec.artifact().expect("artifact");
        assert_eq!(artifact.duration, Duration::from_secs(3));
        assert_eq!(wav_len(artifact), 3 * RATE);
    }

    #[tokio::test]
    async fn immediate_pause_resume_stop_still_produces_artifact() {
        let (mut rec, _clock, _) = controller(MockMicrophone::granting(), 30);
        rec.start_recording().await.unwrap();
        rec.pause_recording();
        rec.resume_recording();
        rec.stop_recording();

        assert_eq!(rec.state(), RecordingState::Stopped);
        assert!(rec.artifact().is_some());
        assert_eq!(rec.elapsed_seconds(), 0);
    }

    #[tokio::test]
    async fn tick_tracks_elapsed_time() {
        let (mut rec, clock, _) = controller(MockMicrophone::granting(), 30);
        rec.start_recording().await.unwrap();
        record_for(&rec, &clock, 1.6);
        rec.tick();
        assert_eq!(rec.elapsed_seconds(), 1);
        assert_eq!(rec.state(), RecordingState::Recording);
    }

    #[tokio::test]
    async fn reaching_max_duration_stops_automatically() {
        let (mut rec, clock, _) = controller(MockMicrophone::granting(), 2);
        rec.start_recording().await.unwrap();

        // One sampling interval past the limit.
        record_for(&rec, &clock, 2.1);
        rec.tick();

        assert_eq!(rec.state(), RecordingState::Stopped);
        assert_eq!(rec.microphone.released(), 1);
        let artifact = rec.artifact().expect("artifact");
        assert_eq!(artifact.duration, Duration::from_secs(2));
        assert_eq!(wav_len(artifact), 2 * RATE);
        assert_eq!(rec.elapsed_seconds(), 2);
    }

    #[tokio::test]
    async fn no_auto_stop_while_paused() {
        let (mut rec, clock, _) = controller(MockMicrophone::granting(), 2);
        rec.start_recording().await.unwrap();
        record_for(&rec, &clock, 1.0);
        rec.pause_recording();
        clock.advance(Duration::from_secs(10));
        rec.tick();
        assert_eq!(rec.state(), RecordingState::Paused);
    }

    #[tokio::test]
    async fn stop_releases_microphone_once() {
        let (mut rec, clock, _) = controller(MockMicrophone::granting(), 30);
        rec.start_recording().await.unwrap();
        record_for(&rec, &clock, 1.0);
        rec.stop_recording();
        rec.stop_recording();
        assert_eq!(rec.microphone.released(), 1);
    }

    #[test]
    fn stop_in_idle_is_noop() {
        let (mut rec, _clock, blobs) = controller(MockMicrophone::granting(), 30);
        rec.stop_recording();
        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(rec.artifact().is_none());
        assert_eq!(blobs.live_count(), 0);
    }

    #[test]
    fn pause_and_resume_outside_valid_states_are_noops() {
        let (mut rec, _clock, _) = controller(MockMicrophone::granting(), 30);
        rec.pause_recording();
        rec.resume_recording();
        assert_eq!(rec.state(), RecordingState::Idle);
    }

    #[tokio::test]
    async fn permission_denied_returns_to_idle_with_specific_error() {
        let mic = MockMicrophone::failing(MicrophoneError::PermissionDenied("NotAllowedError".into()));
        let (mut rec, _clock, _) = controller(mic, 30);

        let err = rec.start_recording().await.unwrap_err();
        assert!(matches!(err, RecorderError::PermissionDenied(_)));
        assert_eq!(rec.state(), RecordingState::Idle);
        assert_eq!(rec.error(), Some(&err));
        assert_eq!(rec.microphone.opened(), 0);
    }

    #[tokio::test]
    async fn missing_device_is_distinguished_from_denial() {
        let mic = MockMicrophone::failing(MicrophoneError::DeviceNotFound);
        let (mut rec, _clock, _) = controller(mic, 30);

        let err = rec.start_recording().await.unwrap_err();
        assert_eq!(err, RecorderError::DeviceNotFound);
        assert_eq!(err.kind(), "device-not-found");
        assert_ne!(err.kind(), RecorderError::PermissionDenied(String::new()).kind());
    }

    #[tokio::test]
    async fn capture_failure_returns_to_idle_without_artifact() {
        let (mut rec, clock, blobs) = controller(MockMicrophone::granting(), 30);
        rec.start_recording().await.unwrap();
        record_for(&rec, &clock, 1.0);
        rec.microphone.feed().fail("device unplugged");

        rec.tick();

        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(matches!(rec.error(), Some(RecorderError::CaptureFailed(_))));
        assert!(rec.artifact().is_none());
        assert_eq!(rec.microphone.released(), 1);
        assert_eq!(blobs.live_count(), 0);

        // Retry is possible straight away.
        rec.start_recording().await.unwrap();
        assert_eq!(rec.state(), RecordingState::Recording);
        assert!(rec.error().is_none());
    }

    #[tokio::test]
    async fn start_is_ignored_until_cleared() {
        let (mut rec, clock, _) = controller(MockMicrophone::granting(), 30);
        rec.start_recording().await.unwrap();
        record_for(&rec, &clock, 1.0);
        rec.stop_recording();

        rec.start_recording().await.unwrap();
        assert_eq!(rec.state(), RecordingState::Stopped);
        assert_eq!(rec.microphone.opened(), 1);

        rec.clear_recording();
        rec.start_recording().await.unwrap();
        assert_eq!(rec.state(), RecordingState::Recording);
        assert_eq!(rec.microphone.opened(), 2);
    }

    #[tokio::test]
    async fn clear_is_safe_from_every_state() {
        let (mut rec, clock, blobs) = controller(MockMicrophone::granting(), 30);

        // Idle
        rec.clear_recording();
        assert_eq!(rec.state(), RecordingState::Idle);

        // Recording
        rec.start_recording().await.unwrap();
        rec.clear_recording();
        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(rec.artifact().is_none());

        // Paused
        rec.start_recording().await.unwrap();
        rec.pause_recording();
        rec.clear_recording();
        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(rec.artifact().is_none());

        // Stopped
        rec.start_recording().await.unwrap();
        record_for(&rec, &clock, 1.0);
        rec.stop_recording();
        assert_eq!(blobs.live_count(), 1);
        rec.clear_recording();
        rec.clear_recording();
        assert_eq!(rec.state(), RecordingState::Idle);
        assert!(rec.artifact().is_none());
        assert_eq!(rec.elapsed_seconds(), 0);

        assert_eq!(blobs.live_count(), 0);
        assert_eq!(rec.microphone.opened(), rec.microphone.released());
    }

    #[tokio::test]
    async fn artifact_url_resolves_to_its_bytes() {
        let (mut rec, clock, blobs) = controller(MockMicrophone::granting(), 30);
        rec.start_recording().await.unwrap();
        record_for(&rec, &clock, 0.5);
        rec.stop_recording();

        let artifact = rec.artifact().unwrap();
        let entry = blobs.resolve(artifact.url.as_str()).expect("live url");
        assert_eq!(entry.bytes, artifact.bytes);
        assert_eq!(entry.media_type, WAV_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn repeated_failed_starts_leak_nothing() {
        let mic = MockMicrophone::failing(MicrophoneError::Other("busy".into()));
        let (mut rec, _clock, blobs) = controller(mic, 30);
        for _ in 0..3 {
            assert!(rec.start_recording().await.is_err());
            rec.clear_recording();
        }
        assert_eq!(rec.microphone.opened(), 0);
        assert_eq!(blobs.live_count(), 0);
        assert!(rec.error().is_none());
    }
}
