//! Per-lesson practice progress.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backend::{Store, StoreError};
use crate::pipeline::PracticeStep;

pub const PROGRESS_KEY: &str = "speak-practice-progress";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub lesson_id: String,
    /// Sorted, without duplicates.
    pub completed_steps: Vec<PracticeStep>,
    pub practice_count: u32,
    pub last_practiced_at: DateTime<Utc>,
    pub is_completed: bool,
}

/// Progress records for every lesson, written through to a [`Store`] on
/// each change.
pub struct ProgressBook<S: Store> {
    store: S,
    records: BTreeMap<String, LessonProgress>,
}

impl<S: Store> ProgressBook<S> {
    /// Load the saved records.  A corrupt record set is discarded with a
    /// warning rather than blocking practice.
    pub fn open(store: S) -> Result<Self, StoreError> {
        let records = match store.get(PROGRESS_KEY)? {
            Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                log::warn!("progress: discarding unreadable record set: {e}");
                BTreeMap::new()
            }),
            None => BTreeMap::new(),
        };
        Ok(Self { store, records })
    }

    pub fn get(&self, lesson_id: &str) -> Option<&LessonProgress> {
        self.records.get(lesson_id)
    }

    pub fn all(&self) -> impl Iterator<Item = &LessonProgress> {
        self.records.values()
    }

    pub fn completed_count(&self) -> usize {
        self.records.values().filter(|p| p.is_completed).count()
    }

    /// Create the record if needed and stamp the practice time.
    pub fn start_lesson(&mut self, lesson_id: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        self.records
            .entry(lesson_id.to_string())
            .and_modify(|p| p.last_practiced_at = now)
            .or_insert_with(|| LessonProgress {
                lesson_id: lesson_id.to_string(),
                completed_steps: Vec::new(),
                practice_count: 0,
                last_practiced_at: now,
                is_completed: false,
            });
        self.save()
    }

    /// Mark one step done.  Ignored for lessons never started.
    pub fn complete_step(&mut self, lesson_id: &str, step: PracticeStep) -> Result<(), StoreError> {
        let Some(progress) = self.records.get_mut(lesson_id) else {
            return Ok(());
        };
        if let Err(pos) = progress.completed_steps.binary_search(&step) {
            progress.completed_steps.insert(pos, step);
        }
        progress.last_practiced_at = Utc::now();
        self.save()
    }

    /// Mark every step done and count one more full practice.
    pub fn complete_lesson(&mut self, lesson_id: &str) -> Result<(), StoreError> {
        let Some(progress) = self.records.get_mut(lesson_id) else {
            return Ok(());
        };
        progress.completed_steps = PracticeStep::ALL.to_vec();
        progress.practice_count += 1;
        progress.last_practiced_at = Utc::now();
        progress.is_completed = true;
        self.save()
    }

    /// Drop one lesson's record, or everything when `lesson_id` is `None`.
    pub fn reset(&mut self, lesson_id: Option<&str>) -> Result<(), StoreError> {
        match lesson_id {
            Some(id) => {
                self.records.remove(id);
                self.save()
            }
            None => {
                self.records.clear();
                self.store.remove(PROGRESS_KEY)
            }
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn save(&mut self) -> Result<(), StoreError> {
        let text = serde_json::to_string(&self.records)?;
        self.store.set(PROGRESS_KEY, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn book() -> ProgressBook<MemoryStore> {
        ProgressBook::open(MemoryStore::new()).unwrap()
    }

    #[test]
    fn start_creates_record() {
        let mut book = book();
        book.start_lesson("lesson-001").unwrap();
        let p = book.get("lesson-001").unwrap();
        assert!(p.completed_steps.is_empty());
        assert_eq!(p.practice_count, 0);
        assert!(!p.is_completed);
    }

    #[test]
    fn restart_keeps_existing_progress() {
        let mut book = book();
        book.start_lesson("lesson-001").unwrap();
        book.complete_step("lesson-001", PracticeStep::Listen).unwrap();
        book.start_lesson("lesson-001").unwrap();
        assert_eq!(
            book.get("lesson-001").unwrap().completed_steps,
            vec![PracticeStep::Listen]
        );
    }

    #[test]
    fn steps_are_sorted_and_unique() {
        let mut book = book();
        book.start_lesson("lesson-001").unwrap();
        for step in [PracticeStep::Relisten, PracticeStep::Listen, PracticeStep::Relisten] {
            book.complete_step("lesson-001", step).unwrap();
        }
        assert_eq!(
            book.get("lesson-001").unwrap().completed_steps,
            vec![PracticeStep::Listen, PracticeStep::Relisten]
        );
    }

    #[test]
    fn completing_step_of_unknown_lesson_is_ignored() {
        let mut book = book();
        book.complete_step("lesson-404", PracticeStep::Listen).unwrap();
        book.complete_lesson("lesson-404").unwrap();
        assert!(book.get("lesson-404").is_none());
    }

    #[test]
    fn complete_lesson_marks_everything() {
        let mut book = book();
        book.start_lesson("lesson-001").unwrap();
        book.complete_lesson("lesson-001").unwrap();
        book.complete_lesson("lesson-001").unwrap();

        let p = book.get("lesson-001").unwrap();
        assert_eq!(p.completed_steps, PracticeStep::ALL.to_vec());
        assert_eq!(p.practice_count, 2);
        assert!(p.is_completed);
        assert_eq!(book.completed_count(), 1);
    }

    #[test]
    fn records_survive_reopen() {
        let mut book = book();
        book.start_lesson("lesson-002").unwrap();
        book.complete_step("lesson-002", PracticeStep::Understand).unwrap();

        let reopened = ProgressBook::open(book.store().clone()).unwrap();
        assert_eq!(reopened.get("lesson-002"), book.get("lesson-002"));
        let raw = book.store().get(PROGRESS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"completedSteps\":[2]"));
    }

    #[test]
    fn reset_one_or_all() {
        let mut book = book();
        book.start_lesson("lesson-001").unwrap();
        book.start_lesson("lesson-002").unwrap();

        book.reset(Some("lesson-001")).unwrap();
        assert!(book.get("lesson-001").is_none());
        assert_eq!(book.all().count(), 1);

        book.reset(None).unwrap();
        assert_eq!(book.all().count(), 0);
        assert_eq!(book.store().get(PROGRESS_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_records_start_empty() {
        let mut store = MemoryStore::new();
        store.set(PROGRESS_KEY, "not json").unwrap();
        let book = ProgressBook::open(store).unwrap();
        assert_eq!(book.all().count(), 0);
    }
}
