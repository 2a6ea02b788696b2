//! Static lesson content.
//!
//! [`LessonCatalog`] is the read-only table of practice lessons: reference
//! clip, script variants, translations, pronunciation tips and keywords.
//! The default catalog is compiled into the binary from
//! `assets/lessons.json`.

pub mod lesson;
pub mod library;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use lesson::{
    Keyword, Language, Lesson, Level, PronunciationTips, Script, Translations, UnknownLanguage,
};
pub use library::{CatalogError, LessonCatalog};
