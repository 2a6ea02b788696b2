//! Reference-clip and recording playback.
//!
//! * [`PlaybackController`]: play/pause/seek/speed state plus the
//!   playthrough counter used to gate the re-listen step.
//! * [`MediaBackend`] / [`MediaSource`]: the output seam.
//! * [`RodioBackend`]: default output device via `rodio`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use speak_practice::audio::BlobRegistry;
//! use speak_practice::player::{PlaybackController, PlaybackSpeed, RodioBackend};
//!
//! let backend = RodioBackend::new("assets", BlobRegistry::new()).unwrap();
//! let mut player = PlaybackController::new(backend);
//! player.bind("/audio/lesson-001.mp3");
//! player.set_speed(PlaybackSpeed::Slow);
//! player.play();
//! while player.is_playing() {
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//!     player.poll();
//! }
//! assert_eq!(player.play_count(), 1);
//! ```

pub mod controller;
pub mod media;
pub mod rodio_backend;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{PlaybackController, PlaybackSpeed};
pub use media::{MediaBackend, MediaError, MediaEvent, MediaSource};
pub use rodio_backend::{resolve_asset_path, RodioBackend};
