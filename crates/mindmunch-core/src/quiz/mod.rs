//! Quiz-gated budget extensions.
//!
//! A locked limit can only get more time by passing a short flashcard quiz.
//! [`ExtensionGate`] runs the quiz and is the only code that can mint an
//! [`ExtensionGrant`], which [`crate::budget::Ledger::extend_limit`] consumes.

mod flashcard;
mod gate;
mod library;

pub use flashcard::{parse_flashcards_tsv, Flashcard, FlashcardProvider, StudySet};
pub use gate::{
    ExtensionGate, ExtensionGrant, GateState, Progress, Question, Verdict, OPTIONS_PER_QUESTION,
};
pub use library::{StudySetLibrary, ACTIVE_STUDY_SET_KEY, STUDY_SETS_KEY};

use serde::{Deserialize, Serialize};

/// Correct answers needed to earn an extension. Not configurable.
pub const REQUIRED_CORRECT_ANSWERS: u8 = 3;

/// Minutes granted per completed quiz. Not configurable.
pub const EXTENSION_MINUTES: u32 = 15;

/// Adjustable rules of one quiz session. The threshold and the granted
/// minutes are fixed and deliberately absent here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizPolicy {
    /// When set, a wrong answer resets the correct-answer count to zero.
    pub reset_streak_on_incorrect: bool,
}
