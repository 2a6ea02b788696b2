//! Client-side persistence for progress and preferences.
//!
//! Components that need persistence receive a [`Store`] explicitly; nothing
//! here is global.  The recording, playback and feedback components never
//! touch it.
//!
//! * [`ProgressBook`]: per-lesson progress under [`PROGRESS_KEY`].
//! * [`SettingsStore`]: [`UserSettings`] under [`SETTINGS_KEY`].

pub mod backend;
pub mod progress;
pub mod settings;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use backend::{JsonFileStore, MemoryStore, Store, StoreError};
pub use progress::{LessonProgress, ProgressBook, PROGRESS_KEY};
pub use settings::{SettingsStore, UserSettings, SETTINGS_KEY};
