//! The seam between [`PlaybackController`](super::PlaybackController) and an
//! actual audio output.
//!
//! A [`MediaBackend`] opens a URL into a [`MediaSource`] and reports what
//! happens to it as [`MediaEvent`]s on a channel owned by the controller.
//! The controller only ever talks to one source at a time; releasing a source
//! and dropping its receiver detaches every event it could still deliver.

use std::sync::mpsc;

use thiserror::Error;

// ---------------------------------------------------------------------------
// MediaEvent
// ---------------------------------------------------------------------------

/// Lifecycle events a source reports.  Times are in seconds.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Metadata is available.
    Loaded { duration: f64 },
    /// Playback position moved.
    Progress { position: f64 },
    /// Playback reached the natural end of the track.
    Ended,
    /// The source could not be loaded or decoded.
    Error(String),
    Started,
    Paused,
}

// ---------------------------------------------------------------------------
// MediaError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("could not load audio: {0}")]
    LoadFailed(String),

    #[error("playback was blocked: {0}")]
    PlayRejected(String),

    #[error("no audio output is available: {0}")]
    OutputUnavailable(String),

    #[error("no audio source is bound")]
    NotBound,
}

impl MediaError {
    /// Stable class name for UI guidance.
    pub fn kind(&self) -> &'static str {
        match self {
            MediaError::LoadFailed(_) => "load-failed",
            MediaError::PlayRejected(_) => "play-rejected",
            MediaError::OutputUnavailable(_) => "output-unavailable",
            MediaError::NotBound => "not-bound",
        }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One opened track.
pub trait MediaSource {
    /// Start or resume.  A rejected request is reported as an error, the
    /// source stays usable.
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    /// Move the playhead.  `position` is already clamped by the caller.
    fn seek(&mut self, position: f64);

    fn set_rate(&mut self, rate: f32);

    /// Give the source a chance to report progress or end-of-track.
    fn poll(&mut self) {}

    /// Stop output and free the underlying resources.  Called exactly once
    /// before the source is dropped.
    fn release(&mut self);
}

/// Opens URLs into sources.
pub trait MediaBackend {
    /// Open `url`.  Load failures are reported through `events` as
    /// [`MediaEvent::Error`]; a source is returned regardless so the caller
    /// can keep a uniform handle.
    fn open(&self, url: &str, events: mpsc::Sender<MediaEvent>) -> Box<dyn MediaSource>;
}

// ---------------------------------------------------------------------------
// MockBackend: test double
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockBackend;

#[cfg(test)]
mod mock {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct Shared {
        sender: RefCell<Option<mpsc::Sender<MediaEvent>>>,
        calls: RefCell<Vec<String>>,
        reject_play: Cell<bool>,
        opened: Cell<usize>,
        released: Cell<usize>,
    }

    /// Backend whose sources report a fixed duration and record every call.
    /// Tests inject further events with [`MockBackend::emit`].
    #[derive(Clone)]
    pub struct MockBackend {
        duration: f64,
        fail_load: bool,
        shared: Rc<Shared>,
    }

    impl MockBackend {
        pub fn with_duration(duration: f64) -> Self {
            Self {
                duration,
                fail_load: false,
                shared: Rc::default(),
            }
        }

        pub fn failing_load() -> Self {
            Self {
                fail_load: true,
                ..Self::with_duration(0.0)
            }
        }

        /// Make subsequent `play()` calls fail as if blocked by policy.
        pub fn reject_play(&self, reject: bool) {
            self.shared.reject_play.set(reject);
        }

        /// Deliver an event through the most recently opened source.
        pub fn emit(&self, event: MediaEvent) {
            if let Some(tx) = self.shared.sender.borrow().as_ref() {
                let _ = tx.send(event);
            }
        }

        /// A sender for the currently open source, for stale-event tests.
        pub fn sender(&self) -> Option<mpsc::Sender<MediaEvent>> {
            self.shared.sender.borrow().clone()
        }

        pub fn calls(&self) -> Vec<String> {
            self.shared.calls.borrow().clone()
        }

        pub fn opened(&self) -> usize {
            self.shared.opened.get()
        }

        pub fn released(&self) -> usize {
            self.shared.released.get()
        }
    }

    struct MockSource {
        shared: Rc<Shared>,
        events: mpsc::Sender<MediaEvent>,
    }

    impl MockSource {
        fn record(&self, call: String) {
            self.shared.calls.borrow_mut().push(call);
        }
    }

    impl MediaSource for MockSource {
        fn play(&mut self) -> Result<(), MediaError> {
            self.record("play".into());
            if self.shared.reject_play.get() {
                return Err(MediaError::PlayRejected("NotAllowedError".into()));
            }
            let _ = self.events.send(MediaEvent::Started);
            Ok(())
        }

        fn pause(&mut self) {
            self.record("pause".into());
            let _ = self.events.send(MediaEvent::Paused);
        }

        fn seek(&mut self, position: f64) {
            self.record(format!("seek {position}"));
        }

        fn set_rate(&mut self, rate: f32) {
            self.record(format!("rate {rate}"));
        }

        fn release(&mut self) {
            self.record("release".into());
            self.shared.released.set(self.shared.released.get() + 1);
        }
    }

    impl MediaBackend for MockBackend {
        fn open(&self, url: &str, events: mpsc::Sender<MediaEvent>) -> Box<dyn MediaSource> {
            self.shared.opened.set(self.shared.opened.get() + 1);
            self.shared.calls.borrow_mut().push(format!("open {url}"));
            let initial = if self.fail_load {
                MediaEvent::Error(format!("cannot decode {url}"))
            } else {
                MediaEvent::Loaded {
                    duration: self.duration,
                }
            };
            let _ = events.send(initial);
            *self.shared.sender.borrow_mut() = Some(events.clone());
            Box::new(MockSource {
                shared: Rc::clone(&self.shared),
                events,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_distinct() {
        let kinds = [
            MediaError::LoadFailed(String::new()).kind(),
            MediaError::PlayRejected(String::new()).kind(),
            MediaError::OutputUnavailable(String::new()).kind(),
            MediaError::NotBound.kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
