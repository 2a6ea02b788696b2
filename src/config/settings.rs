//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to each
//! subsystem by value.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Environment variable consulted when `gemini.api_key` is unset.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// ---------------------------------------------------------------------------
// GeminiConfig
// ---------------------------------------------------------------------------

/// Connection settings for the generative-AI backend (transcription and
/// feedback generation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base URL of the API endpoint, without a trailing slash.
    pub base_url: String,
    /// API key.  `None` (or empty) falls back to `$GEMINI_API_KEY`.
    pub api_key: Option<String>,
    /// Model identifier used for both calls (e.g. `"gemini-2.0-flash"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0) for feedback generation.
    pub temperature: f32,
    /// Per-request timeout in seconds applied by the HTTP client.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".into(),
            api_key: None,
            model: "gemini-2.0-flash".into(),
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    /// The configured key, or the value of `$GEMINI_API_KEY` when the file
    /// leaves it blank.
    pub fn resolved_api_key(&self) -> Option<String> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Some(key.to_string()),
            _ => std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Recording stops automatically once this many seconds are captured.
    pub max_duration_secs: u32,
    /// How often the elapsed-time display is refreshed, in milliseconds.
    pub tick_interval_ms: u64,
    /// Sample rate of the finalized WAV artifact.
    pub target_sample_rate: u32,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 30,
            tick_interval_ms: 100,
            target_sample_rate: 16_000,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Settings for reference-clip playback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Directory that lesson URLs such as `/audio/lesson-001.mp3` are
    /// resolved against.  `None` means the app data directory.
    pub assets_dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// SubmissionConfig
// ---------------------------------------------------------------------------

/// Limits applied at the feedback submission boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Largest accepted audio payload in bytes.
    pub max_audio_bytes: usize,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_audio_bytes: 10 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use speak_practice::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Generative-AI backend settings.
    pub gemini: GeminiConfig,
    /// Microphone capture settings.
    pub recording: RecordingConfig,
    /// Reference playback settings.
    pub playback: PlaybackConfig,
    /// Submission boundary limits.
    pub submission: SubmissionConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory lesson audio URLs are resolved against.
    pub fn assets_dir(&self) -> PathBuf {
        self.playback
            .assets_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().assets_dir)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
