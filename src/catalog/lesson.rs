//! Lesson records and the closed language set.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Learner display languages.  `Ja` is the reference language of every
/// lesson; the others get translations and supplementary notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Ja,
    En,
    Vi,
    Zh,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::Ja, Language::En, Language::Vi, Language::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Language::Ja => "ja",
            Language::En => "en",
            Language::Vi => "vi",
            Language::Zh => "zh",
        }
    }

    /// Name of the language written in Japanese, as used in feedback
    /// prompts.  Empty for Japanese itself.
    pub fn japanese_name(self) -> &'static str {
        match self {
            Language::Ja => "",
            Language::En => "英語",
            Language::Vi => "ベトナム語",
            Language::Zh => "中国語",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Returned when a language code is outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLanguage(pub String);

impl fmt::Display for UnknownLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported language code {:?}", self.0)
    }
}

impl std::error::Error for UnknownLanguage {}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Lesson
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    N5,
    N4,
}

/// The sentence being practised in three writing styles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    /// Kana with word spacing, for display.
    pub japanese: String,
    /// Kana without spacing or punctuation; compared against transcriptions.
    pub japanese_plain: String,
    pub japanese_kanji: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translations {
    pub en: String,
    pub vi: String,
    pub zh: String,
}

impl Translations {
    /// `None` for Japanese, which needs no translation.
    pub fn get(&self, language: Language) -> Option<&str> {
        match language {
            Language::Ja => None,
            Language::En => Some(&self.en),
            Language::Vi => Some(&self.vi),
            Language::Zh => Some(&self.zh),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PronunciationTips {
    pub ja: Vec<String>,
    pub en: Vec<String>,
    pub vi: Vec<String>,
    pub zh: Vec<String>,
}

impl PronunciationTips {
    pub fn for_language(&self, language: Language) -> &[String] {
        match language {
            Language::Ja => &self.ja,
            Language::En => &self.en,
            Language::Vi => &self.vi,
            Language::Zh => &self.zh,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    pub reading: String,
    pub meaning: Translations,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub level: Level,
    pub category: String,
    /// Site-relative reference clip, e.g. `/audio/lesson-001.mp3`.
    pub audio_url: String,
    pub script: Script,
    pub translations: Translations,
    pub pronunciation_tips: PronunciationTips,
    pub keywords: Vec<Keyword>,
    /// Nominal clip length in seconds.
    pub duration: u32,
}
