//! Five-step practice session.
//!
//! [`PracticeSession`] tracks where a learner is within one lesson and
//! refuses to move on until the current step's gate is met.
//!
//! ```text
//! Listen ─▶ Understand ─▶ Relisten ─▶ Speak ─▶ Record ─▶ (lesson complete)
//!                          │           │        │
//!                          │           │        └─ needs a FeedbackResult
//!                          │           └─ needs 3 speak-along attempts
//!                          └─ needs `target_replays` full playthroughs
//! ```
//!
//! The session never touches persistence; callers record the returned
//! [`Advance`] in a [`ProgressBook`](crate::store::ProgressBook).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::runner::FeedbackResult;

/// Speak-along attempts required before recording.
pub const SPEAK_PRACTICE_TARGET: u32 = 3;

// ---------------------------------------------------------------------------
// PracticeStep
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PracticeStep {
    Listen = 1,
    Understand = 2,
    Relisten = 3,
    Speak = 4,
    Record = 5,
}

impl PracticeStep {
    pub const ALL: [PracticeStep; 5] = [
        PracticeStep::Listen,
        PracticeStep::Understand,
        PracticeStep::Relisten,
        PracticeStep::Speak,
        PracticeStep::Record,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    pub fn label(self) -> &'static str {
        match self {
            PracticeStep::Listen => "Listen",
            PracticeStep::Understand => "Understand",
            PracticeStep::Relisten => "Listen again",
            PracticeStep::Speak => "Speak along",
            PracticeStep::Record => "Record",
        }
    }
}

impl fmt::Display for PracticeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.label())
    }
}

impl From<PracticeStep> for u8 {
    fn from(step: PracticeStep) -> Self {
        step.number()
    }
}

impl TryFrom<u8> for PracticeStep {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::from_number(n).ok_or_else(|| format!("practice step must be 1-5, got {n}"))
    }
}

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------

/// Why the session cannot move as requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("listen {remaining} more time(s) to continue")]
    NotEnoughReplays { remaining: u32 },

    #[error("practise {remaining} more time(s) to continue")]
    NotEnoughPractice { remaining: u32 },

    #[error("record and get feedback to finish")]
    NoFeedback,

    #[error("step {0} has not been reached yet")]
    NotReached(PracticeStep),

    #[error("lesson is already complete")]
    Finished,
}

/// Result of a successful [`PracticeSession::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// `completed` is done; the session moved on to `now`.
    Moved {
        completed: PracticeStep,
        now: PracticeStep,
    },
    /// The last step is done.
    LessonComplete,
}

// ---------------------------------------------------------------------------
// PracticeSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PracticeSession {
    lesson_id: String,
    current: PracticeStep,
    furthest: PracticeStep,
    target_replays: u32,
    replays: u32,
    speak_attempts: u32,
    feedback: Option<FeedbackResult>,
    finished: bool,
}

impl PracticeSession {
    pub fn new(lesson_id: impl Into<String>, target_replays: u32) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            current: PracticeStep::Listen,
            furthest: PracticeStep::Listen,
            target_replays: target_replays.max(1),
            replays: 0,
            speak_attempts: 0,
            feedback: None,
            finished: false,
        }
    }

    pub fn lesson_id(&self) -> &str {
        &self.lesson_id
    }

    pub fn current(&self) -> PracticeStep {
        self.current
    }

    pub fn furthest(&self) -> PracticeStep {
        self.furthest
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn target_replays(&self) -> u32 {
        self.target_replays
    }

    pub fn replays(&self) -> u32 {
        self.replays
    }

    pub fn speak_attempts(&self) -> u32 {
        self.speak_attempts
    }

    pub fn feedback(&self) -> Option<&FeedbackResult> {
        self.feedback.as_ref()
    }

    /// Mirror the player's play count during the re-listen step.
    pub fn set_replays(&mut self, play_count: u32) {
        self.replays = play_count;
    }

    pub fn record_speak_attempt(&mut self) {
        self.speak_attempts += 1;
    }

    pub fn set_feedback(&mut self, result: FeedbackResult) {
        self.feedback = Some(result);
    }

    /// Forget the last feedback, e.g. when the learner records again.
    pub fn clear_feedback(&mut self) {
        self.feedback = None;
    }

    /// Check the current step's gate.
    pub fn can_advance(&self) -> Result<(), StepError> {
        if self.finished {
            return Err(StepError::Finished);
        }
        match self.current {
            PracticeStep::Listen | PracticeStep::Understand => Ok(()),
            PracticeStep::Relisten if self.replays < self.target_replays => {
                Err(StepError::NotEnoughReplays {
                    remaining: self.target_replays - self.replays,
                })
            }
            PracticeStep::Speak if self.speak_attempts < SPEAK_PRACTICE_TARGET => {
                Err(StepError::NotEnoughPractice {
                    remaining: SPEAK_PRACTICE_TARGET - self.speak_attempts,
                })
            }
            PracticeStep::Record if self.feedback.is_none() => Err(StepError::NoFeedback),
            _ => Ok(()),
        }
    }

    /// Complete the current step and move to the next one.
    pub fn advance(&mut self) -> Result<Advance, StepError> {
        self.can_advance()?;
        let completed = self.current;
        match completed.next() {
            Some(now) => {
                self.current = now;
                self.furthest = self.furthest.max(now);
                log::debug!("session {}: {completed} → {now}", self.lesson_id);
                Ok(Advance::Moved { completed, now })
            }
            None => {
                self.finished = true;
                log::info!("session {}: lesson complete", self.lesson_id);
                Ok(Advance::LessonComplete)
            }
        }
    }

    /// Step back one.  No-op on the first step.
    pub fn go_back(&mut self) -> PracticeStep {
        if let Some(prev) = self.current.previous() {
            self.current = prev;
        }
        self.current
    }

    /// Jump to any step already reached.
    pub fn go_to(&mut self, step: PracticeStep) -> Result<(), StepError> {
        if step > self.furthest {
            return Err(StepError::NotReached(step));
        }
        self.current = step;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
