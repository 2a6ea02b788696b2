//! Single-track playback state.
//!
//! [`PlaybackController`] wraps whatever [`MediaSource`] is currently bound
//! and folds its [`MediaEvent`]s into an observable state: play/pause flags,
//! position, duration, speed, a classified error and the number of complete
//! playthroughs.  The play count is the gate for the re-listen step, so it
//! only moves on a natural end of track that followed a start.

use std::sync::mpsc;

use super::media::{MediaBackend, MediaError, MediaEvent, MediaSource};

// ---------------------------------------------------------------------------
// PlaybackSpeed
// ---------------------------------------------------------------------------

/// How far a rate may sit from a selectable speed and still match it.
pub const RATE_TOLERANCE: f32 = 0.01;

/// The playback rates a learner can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 3] = [PlaybackSpeed::Slow, PlaybackSpeed::Normal, PlaybackSpeed::Fast];

    pub fn rate(self) -> f32 {
        match self {
            PlaybackSpeed::Slow => 0.75,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::Fast => 1.25,
        }
    }

    /// The selectable speed within [`RATE_TOLERANCE`] of `rate`, if any.
    pub fn from_rate(rate: f32) -> Option<Self> {
        let speed = Self::nearest(rate);
        ((speed.rate() - rate).abs() <= RATE_TOLERANCE).then_some(speed)
    }

    /// The selectable rate closest to `rate` (used for stored preferences,
    /// which allow a wider range).
    pub fn nearest(rate: f32) -> Self {
        Self::ALL
            .into_iter()
            .min_by(|a, b| {
                (a.rate() - rate)
                    .abs()
                    .total_cmp(&(b.rate() - rate).abs())
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    url: Option<String>,
    source: Option<Box<dyn MediaSource>>,
    events: Option<mpsc::Receiver<MediaEvent>>,

    is_playing: bool,
    is_paused: bool,
    current_time: f64,
    duration: f64,
    play_count: u32,
    speed: PlaybackSpeed,
    error: Option<MediaError>,
    /// Set on start, cleared when a completion is counted.
    has_started: bool,
    /// A forward seek skipped part of the track; cleared once playback is
    /// back at the start.
    skipped_ahead: bool,
}

impl<B: MediaBackend> PlaybackController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            url: None,
            source: None,
            events: None,
            is_playing: false,
            is_paused: false,
            current_time: 0.0,
            duration: 0.0,
            play_count: 0,
            speed: PlaybackSpeed::Normal,
            error: None,
            has_started: false,
            skipped_ahead: false,
        }
    }

    /// Bind to `url`, releasing the previous source first.  State starts
    /// fresh for the new track; the selected speed carries over.
    pub fn bind(&mut self, url: &str) {
        self.unbind();

        let (tx, rx) = mpsc::channel();
        let mut source = self.backend.open(url, tx);
        source.set_rate(self.speed.rate());

        log::debug!("player: bound {url}");
        self.url = Some(url.to_string());
        self.source = Some(source);
        self.events = Some(rx);
        self.drain();
    }

    /// Release the current source, if any, and clear all track state.
    pub fn unbind(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
            log::debug!("player: released {}", self.url.as_deref().unwrap_or_default());
        }
        self.events = None;
        self.url = None;
        self.is_playing = false;
        self.is_paused = false;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.play_count = 0;
        self.error = None;
        self.has_started = false;
        self.skipped_ahead = false;
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Start or resume.  Failures land in [`error`](Self::error); nothing is
    /// returned to the caller and a later retry is allowed.
    pub fn play(&mut self) {
        self.drain();
        let Some(source) = self.source.as_mut() else {
            self.error = Some(MediaError::NotBound);
            return;
        };
        if let Some(MediaError::LoadFailed(_)) = self.error {
            log::warn!("player: play ignored, source failed to load");
            return;
        }

        match source.play() {
            Ok(()) => {
                self.error = None;
                self.mark_started();
            }
            Err(e) => {
                log::warn!("player: {e}");
                self.error = Some(e);
            }
        }
        self.drain();
    }

    pub fn pause(&mut self) {
        self.drain();
        if let Some(source) = self.source.as_mut() {
            source.pause();
            if self.is_playing {
                self.is_playing = false;
                self.is_paused = true;
            }
        }
        self.drain();
    }

    /// Move to `target` seconds, clamped to `[0, duration]`.  Play/pause
    /// flags are untouched.
    ///
    /// Skipping forward means the current run no longer counts as a full
    /// playthrough; seeking back to the start makes it count again.
    pub fn seek(&mut self, target: f64) {
        self.drain();
        let position = if target.is_nan() {
            0.0
        } else {
            target.clamp(0.0, self.duration.max(0.0))
        };
        let Some(source) = self.source.as_mut() else {
            return;
        };
        source.seek(position);

        if position <= 0.0 {
            self.skipped_ahead = false;
            self.has_started = self.is_playing;
        } else if position > self.current_time {
            log::debug!("player: skipped ahead to {position:.2}s, run will not count");
            self.skipped_ahead = true;
            self.has_started = false;
        }
        self.current_time = position;
    }

    pub fn set_speed(&mut self, speed: PlaybackSpeed) {
        self.speed = speed;
        if let Some(source) = self.source.as_mut() {
            source.set_rate(speed.rate());
        }
    }

    /// Pause and rewind to the start.  The play count is kept.
    pub fn stop(&mut self) {
        self.drain();
        if let Some(source) = self.source.as_mut() {
            source.pause();
            source.seek(0.0);
        }
        self.drain();
        self.current_time = 0.0;
        self.is_playing = false;
        self.is_paused = false;
        self.has_started = false;
        self.skipped_ahead = false;
    }

    /// [`stop`](Self::stop) and zero the play count.
    pub fn reset(&mut self) {
        self.stop();
        self.play_count = 0;
    }

    /// Let the source report progress and fold in pending events.  Call
    /// periodically while playing.
    pub fn poll(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.poll();
        }
        self.drain();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn play_count(&self) -> u32 {
        self.play_count
    }

    pub fn speed(&self) -> PlaybackSpeed {
        self.speed
    }

    pub fn error(&self) -> Option<&MediaError> {
        self.error.as_ref()
    }

    /// `false` when nothing is bound or the bound source failed to load, so
    /// `play()` cannot succeed until something else is bound.
    pub fn can_play(&self) -> bool {
        self.source.is_some() && !matches!(self.error, Some(MediaError::LoadFailed(_)))
    }

    // -----------------------------------------------------------------------
    // Event folding
    // -----------------------------------------------------------------------

    fn drain(&mut self) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        let pending: Vec<MediaEvent> = events.try_iter().collect();
        for event in pending {
            self.apply(event);
        }
    }

    fn mark_started(&mut self) {
        self.is_playing = true;
        self.is_paused = false;
        self.has_started = !self.skipped_ahead;
    }

    fn apply(&mut self, event: MediaEvent) {
        match event {
            MediaEvent::Loaded { duration } => {
                self.duration = duration.max(0.0);
            }
            MediaEvent::Progress { position } => {
                self.current_time = if self.duration > 0.0 {
                    position.clamp(0.0, self.duration)
                } else {
                    position.max(0.0)
                };
            }
            MediaEvent::Ended => {
                self.is_playing = false;
                self.is_paused = false;
                self.current_time = 0.0;
                self.skipped_ahead = false;
                if self.has_started {
                    self.has_started = false;
                    self.play_count += 1;
                    log::debug!("player: playthrough {} complete", self.play_count);
                }
            }
            MediaEvent::Error(message) => {
                log::warn!("player: load failed: {message}");
                self.is_playing = false;
                self.error = Some(MediaError::LoadFailed(message));
            }
            MediaEvent::Started => self.mark_started(),
            MediaEvent::Paused => {
                if self.is_playing {
                    self.is_playing = false;
                    self.is_paused = true;
                }
            }
        }
    }
}

impl<B: MediaBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.release();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
