//! Read-only lesson lookup.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::lesson::{Lesson, Level};

/// The catalog that ships with the binary.
const BUNDLED_LESSONS: &str = include_str!("../../assets/lessons.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read lesson catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid lesson catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("lesson id {0:?} appears more than once")]
    DuplicateId(String),
}

impl CatalogError {
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::Io(_) => "io",
            CatalogError::Parse(_) => "parse",
            CatalogError::DuplicateId(_) => "duplicate-id",
        }
    }
}

#[derive(Deserialize)]
struct CatalogDocument {
    lessons: Vec<Lesson>,
}

#[derive(Debug, Clone)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
}

impl LessonCatalog {
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_LESSONS)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(text)?;
        let mut seen = HashSet::new();
        for lesson in &doc.lessons {
            if !seen.insert(lesson.id.as_str()) {
                return Err(CatalogError::DuplicateId(lesson.id.clone()));
            }
        }
        log::debug!("catalog: {} lessons", doc.lessons.len());
        Ok(Self {
            lessons: doc.lessons,
        })
    }

    pub fn get(&self, id: &str) -> Option<&Lesson> {
        self.lessons.iter().find(|lesson| lesson.id == id)
    }

    pub fn by_category(&self, category: &str) -> Vec<&Lesson> {
        self.lessons
            .iter()
            .filter(|lesson| lesson.category == category)
            .collect()
    }

    pub fn by_level(&self, level: Level) -> Vec<&Lesson> {
        self.lessons
            .iter()
            .filter(|lesson| lesson.level == level)
            .collect()
    }

    /// Distinct categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.lessons
            .iter()
            .map(|lesson| lesson.category.as_str())
            .filter(|category| seen.insert(*category))
            .collect()
    }

    pub fn all(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}
