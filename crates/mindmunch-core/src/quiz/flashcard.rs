use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub id: u64,
    pub term: String,
    pub definition: String,
}

impl Flashcard {
    pub fn new(id: u64, term: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            id,
            term: term.into(),
            definition: definition.into(),
        }
    }
}

/// A named deck of flashcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySet {
    pub name: String,
    /// Where the cards came from (file path or URL), informational only.
    #[serde(default)]
    pub source: Option<String>,
    pub flashcards: Vec<Flashcard>,
}

impl StudySet {
    pub fn new(name: impl Into<String>, source: Option<String>, flashcards: Vec<Flashcard>) -> Self {
        Self {
            name: name.into(),
            source,
            flashcards,
        }
    }

    /// Number of different definitions; duplicates cannot serve as separate
    /// answer options.
    pub fn distinct_definitions(&self) -> usize {
        self.flashcards
            .iter()
            .map(|c| c.definition.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Source of the flashcards used by the extension gate.
pub trait FlashcardProvider: Send + Sync {
    /// The set quizzes are drawn from, if the user picked one.
    fn active_set(&self) -> Option<StudySet>;
}

/// A fixed set is always active.
impl FlashcardProvider for StudySet {
    fn active_set(&self) -> Option<StudySet> {
        Some(self.clone())
    }
}

/// Parse "term<TAB>definition" lines, the plain-text export format of most
/// flashcard services.
///
/// Blank lines and lines starting with `#` are skipped. Cards are numbered
/// from 1 in file order.
pub fn parse_flashcards_tsv(text: &str) -> Result<Vec<Flashcard>, ValidationError> {
    let mut cards = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let invalid = |message: &str| ValidationError::InvalidValue {
            field: format!("line {}", index + 1),
            message: message.to_string(),
        };
        let (term, definition) = line
            .split_once('\t')
            .ok_or_else(|| invalid("expected term<TAB>definition"))?;
        let (term, definition) = (term.trim(), definition.trim());
        if term.is_empty() {
            return Err(invalid("term is empty"));
        }
        if definition.is_empty() {
            return Err(invalid("definition is empty"));
        }
        cards.push(Flashcard::new(cards.len() as u64 + 1, term, definition));
    }
    if cards.is_empty() {
        return Err(ValidationError::EmptyCollection("flashcards".into()));
    }
    Ok(cards)
}
