//! Learner preferences.

use serde::{Deserialize, Serialize};

use super::backend::{Store, StoreError};
use crate::catalog::Language;

pub const SETTINGS_KEY: &str = "speak-practice-settings";

const MIN_SPEED: f32 = 0.5;
const MAX_SPEED: f32 = 2.0;
const MIN_REPLAYS: u32 = 1;
const MAX_REPLAYS: u32 = 10;

/// Missing fields in a stored record take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub display_language: Language,
    pub playback_speed: f32,
    /// Full playthroughs required in the re-listen step.
    pub target_replays: u32,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            display_language: Language::Ja,
            playback_speed: 1.0,
            target_replays: 3,
        }
    }
}

pub struct SettingsStore<S: Store> {
    store: S,
    settings: UserSettings,
}

impl<S: Store> SettingsStore<S> {
    pub fn open(store: S) -> Result<Self, StoreError> {
        let settings = match store.get(SETTINGS_KEY)? {
            Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                log::warn!("settings: unreadable record, using defaults: {e}");
                UserSettings::default()
            }),
            None => UserSettings::default(),
        };
        Ok(Self { store, settings })
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn set_language(&mut self, language: Language) -> Result<(), StoreError> {
        self.settings.display_language = language;
        self.save()
    }

    /// Clamped to `[0.5, 2.0]`.
    pub fn set_playback_speed(&mut self, speed: f32) -> Result<(), StoreError> {
        self.settings.playback_speed = if speed.is_nan() {
            UserSettings::default().playback_speed
        } else {
            speed.clamp(MIN_SPEED, MAX_SPEED)
        };
        self.save()
    }

    /// Clamped to `[1, 10]`.
    pub fn set_target_replays(&mut self, count: u32) -> Result<(), StoreError> {
        self.settings.target_replays = count.clamp(MIN_REPLAYS, MAX_REPLAYS);
        self.save()
    }

    /// Back to defaults; the stored record is removed.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.settings = UserSettings::default();
        self.store.remove(SETTINGS_KEY)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let text = serde_json::to_string(&self.settings)?;
        self.store.set(SETTINGS_KEY, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn open() -> SettingsStore<MemoryStore> {
        SettingsStore::open(MemoryStore::new()).unwrap()
    }

    #[test]
    fn defaults() {
        let s = open();
        assert_eq!(s.settings(), &UserSettings::default());
        assert_eq!(s.settings().display_language, Language::Ja);
        assert_eq!(s.settings().playback_speed, 1.0);
        assert_eq!(s.settings().target_replays, 3);
    }

    #[test]
    fn speed_is_clamped() {
        let mut s = open();
        s.set_playback_speed(3.0).unwrap();
        assert_eq!(s.settings().playback_speed, 2.0);
        s.set_playback_speed(0.1).unwrap();
        assert_eq!(s.settings().playback_speed, 0.5);
        s.set_playback_speed(f32::NAN).unwrap();
        assert_eq!(s.settings().playback_speed, 1.0);
    }

    #[test]
    fn replays_are_clamped() {
        let mut s = open();
        s.set_target_replays(0).unwrap();
        assert_eq!(s.settings().target_replays, 1);
        s.set_target_replays(25).unwrap();
        assert_eq!(s.settings().target_replays, 10);
    }

    #[test]
    fn partial_record_merges_with_defaults() {
        let mut store = MemoryStore::new();
        store.set(SETTINGS_KEY, r#"{"displayLanguage":"vi"}"#).unwrap();
        let s = SettingsStore::open(store).unwrap();
        assert_eq!(s.settings().display_language, Language::Vi);
        assert_eq!(s.settings().target_replays, 3);
    }

    #[test]
    fn changes_persist_and_reset_removes() {
        let mut s = open();
        s.set_language(Language::Zh).unwrap();
        let reopened = SettingsStore::open(s.store().clone()).unwrap();
        assert_eq!(reopened.settings().display_language, Language::Zh);

        s.reset().unwrap();
        assert_eq!(s.settings(), &UserSettings::default());
        assert_eq!(s.store().get(SETTINGS_KEY).unwrap(), None);
    }
}
