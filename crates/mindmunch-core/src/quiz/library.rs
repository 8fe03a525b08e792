//! Saved study sets.
//!
//! Sets live in the durable store so the quiz can run in any process. The
//! active set is stored by name; deleting it leaves no active set.

use std::sync::Arc;

use tracing::{info, warn};

use super::flashcard::{FlashcardProvider, StudySet};
use crate::error::QuizError;
use crate::storage::KvStore;

pub const STUDY_SETS_KEY: &str = "study_sets";
pub const ACTIVE_STUDY_SET_KEY: &str = "active_study_set";

pub struct StudySetLibrary {
    store: Arc<dyn KvStore>,
    max_sets: usize,
}

impl StudySetLibrary {
    pub fn new(store: Arc<dyn KvStore>, max_sets: usize) -> Self {
        Self { store, max_sets }
    }

    pub fn max_sets(&self) -> usize {
        self.max_sets
    }

    /// All saved sets. An unreadable record reads as empty.
    pub fn list(&self) -> Vec<StudySet> {
        match self.read_sets() {
            Ok(sets) => sets,
            Err(e) => {
                warn!(error = %e, "failed to read study sets");
                Vec::new()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<StudySet> {
        self.list().into_iter().find(|s| s.name == name)
    }

    /// Save a new set. Names are unique and the library holds at most
    /// `max_sets` sets.
    pub fn add(&self, set: StudySet) -> Result<(), QuizError> {
        if set.name.trim().is_empty() {
            return Err(QuizError::Library("study set name is empty".into()));
        }
        if set.flashcards.is_empty() {
            return Err(QuizError::Library(format!("study set '{}' has no cards", set.name)));
        }
        let mut sets = self.read_sets()?;
        if sets.iter().any(|s| s.name == set.name) {
            return Err(QuizError::Library(format!("study set '{}' already exists", set.name)));
        }
        if sets.len() >= self.max_sets {
            return Err(QuizError::Library(format!(
                "you can only save up to {} study sets",
                self.max_sets
            )));
        }
        info!(name = %set.name, cards = set.flashcards.len(), "study set added");
        sets.push(set);
        self.write(STUDY_SETS_KEY, &sets)
    }

    /// Remove a set by name. Clears the active selection if it pointed at it.
    pub fn delete(&self, name: &str) -> Result<StudySet, QuizError> {
        let mut sets = self.read_sets()?;
        let pos = sets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| QuizError::Library(format!("no study set named '{name}'")))?;
        let removed = sets.remove(pos);
        self.write(STUDY_SETS_KEY, &sets)?;
        if self.active_name().as_deref() == Some(name) {
            self.write(ACTIVE_STUDY_SET_KEY, &Option::<String>::None)?;
        }
        info!(name, "study set deleted");
        Ok(removed)
    }

    pub fn set_active(&self, name: &str) -> Result<(), QuizError> {
        if self.get(name).is_none() {
            return Err(QuizError::Library(format!("no study set named '{name}'")));
        }
        self.write(ACTIVE_STUDY_SET_KEY, &Some(name))?;
        info!(name, "active study set changed");
        Ok(())
    }

    pub fn active_name(&self) -> Option<String> {
        let bytes = self.store.get(ACTIVE_STUDY_SET_KEY).ok()??;
        serde_json::from_slice::<Option<String>>(&bytes).ok()?
    }

    fn read_sets(&self) -> Result<Vec<StudySet>, QuizError> {
        let bytes = self
            .store
            .get(STUDY_SETS_KEY)
            .map_err(|e| QuizError::Library(e.to_string()))?;
        match bytes {
            None => Ok(Vec::new()),
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| QuizError::Library(e.to_string()))
            }
        }
    }

    fn write<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), QuizError> {
        let bytes = serde_json::to_vec(value).map_err(|e| QuizError::Library(e.to_string()))?;
        self.store
            .set(key, &bytes)
            .map_err(|e| QuizError::Library(e.to_string()))
    }
}

impl FlashcardProvider for StudySetLibrary {
    fn active_set(&self) -> Option<StudySet> {
        let name = self.active_name()?;
        self.get(&name)
    }
}
