//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\speak-practice\
//!   macOS:   ~/Library/Application Support/speak-practice/
//!   Linux:   ~/.config/speak-practice/
//!
//! Data dir (progress store, lesson audio):
//!   Windows: %LOCALAPPDATA%\speak-practice\
//!   macOS:   ~/Library/Application Support/speak-practice/
//!   Linux:   ~/.local/share/speak-practice/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory holding one JSON file per store key.
    pub store_dir: PathBuf,
    /// Root that lesson audio URLs (`/audio/...`) are resolved against.
    pub assets_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "speak-practice";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            store_dir: data_dir.join("store"),
            assets_dir: data_dir.join("assets"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
