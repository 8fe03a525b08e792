//! Extension gate - quiz state machine guarding budget extensions.
//!
//! ## States
//!
//! - **Idle**: no session.
//! - **Challenging**: a question is shown and awaits an answer.
//! - **Correct / Incorrect**: the current question was answered; call
//!   [`ExtensionGate::next_question`] to continue.
//!
//! The answer that brings the correct count to [`REQUIRED_CORRECT_ANSWERS`] ends the
//! session and returns [`Progress::Completed`] with an [`ExtensionGrant`]. The
//! gate is then Idle again.
//!
//! ## Questions
//!
//! Each question shows a random card's term with four options: its definition
//! plus three other distinct definitions from the same set, shuffled. The set
//! is snapshotted when the session starts.

use std::collections::BTreeSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::flashcard::{Flashcard, FlashcardProvider};
use super::{QuizPolicy, EXTENSION_MINUTES, REQUIRED_CORRECT_ANSWERS};
use crate::budget::LimitId;
use crate::error::{NoQuizReason, QuizError};

/// Answer options shown per question.
pub const OPTIONS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    Idle,
    Challenging,
    Correct,
    Incorrect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// 1-based position in the session.
    pub number: u32,
    pub term: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect { correct_answer: String },
}

impl Verdict {
    pub fn is_correct(&self) -> bool {
        matches!(self, Verdict::Correct)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Progress {
    Answered(Verdict),
    Completed(ExtensionGrant),
}

/// Proof that a quiz was completed for a limit.
///
/// Only the gate constructs grants, and a grant is consumed by
/// [`crate::budget::Ledger::extend_limit`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a grant does nothing until passed to Ledger::extend_limit"]
pub struct ExtensionGrant {
    limit_id: LimitId,
    minutes: u32,
}

impl ExtensionGrant {
    pub fn limit_id(&self) -> LimitId {
        self.limit_id
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    #[cfg(test)]
    pub(crate) fn for_tests(limit_id: LimitId, minutes: u32) -> Self {
        Self { limit_id, minutes }
    }
}

struct Session {
    limit_id: LimitId,
    cards: Vec<Flashcard>,
    definitions: Vec<String>,
    current: Flashcard,
    question: Question,
    verdict: Option<Verdict>,
    correct: u8,
    incorrect: u32,
}

pub struct ExtensionGate {
    provider: Arc<dyn FlashcardProvider>,
    policy: QuizPolicy,
    rng: Box<dyn RngCore + Send>,
    session: Option<Session>,
}

impl ExtensionGate {
    pub fn new(provider: Arc<dyn FlashcardProvider>, policy: QuizPolicy) -> Self {
        Self {
            provider,
            policy,
            rng: Box::new(StdRng::from_entropy()),
            session: None,
        }
    }

    /// Gate with a deterministic question order.
    pub fn with_seed(provider: Arc<dyn FlashcardProvider>, policy: QuizPolicy, seed: u64) -> Self {
        Self {
            provider,
            policy,
            rng: Box::new(Pcg64::seed_from_u64(seed)),
            session: None,
        }
    }

    pub fn policy(&self) -> &QuizPolicy {
        &self.policy
    }

    pub fn state(&self) -> GateState {
        match &self.session {
            None => GateState::Idle,
            Some(s) => match &s.verdict {
                None => GateState::Challenging,
                Some(Verdict::Correct) => GateState::Correct,
                Some(Verdict::Incorrect { .. }) => GateState::Incorrect,
            },
        }
    }

    /// Limit the running session is for.
    pub fn limit_id(&self) -> Option<LimitId> {
        self.session.as_ref().map(|s| s.limit_id)
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.session.as_ref().map(|s| &s.question)
    }

    pub fn correct_answers(&self) -> u8 {
        self.session.as_ref().map_or(0, |s| s.correct)
    }

    pub fn incorrect_answers(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.incorrect)
    }

    /// Start a session for `limit_id`, replacing any running one.
    pub fn start(&mut self, limit_id: LimitId) -> Result<Question, QuizError> {
        self.session = None;
        let set = self
            .provider
            .active_set()
            .ok_or(NoQuizReason::NoActiveSet)?;

        let definitions: Vec<String> = set
            .flashcards
            .iter()
            .map(|c| c.definition.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if definitions.len() < OPTIONS_PER_QUESTION {
            return Err(NoQuizReason::NotEnoughCards {
                name: set.name,
                distinct: definitions.len(),
                required: OPTIONS_PER_QUESTION,
            }
            .into());
        }

        let (current, question) = draw(&mut *self.rng, &set.flashcards, &definitions, 1)?;
        info!(limit_id = %limit_id, set = %set.name, cards = set.flashcards.len(), "quiz started");
        self.session = Some(Session {
            limit_id,
            cards: set.flashcards,
            definitions,
            current,
            question: question.clone(),
            verdict: None,
            correct: 0,
            incorrect: 0,
        });
        Ok(question)
    }

    /// Answer the current question with one of its options.
    pub fn submit(&mut self, choice: &str) -> Result<Progress, QuizError> {
        let policy = self.policy;
        let session = self.session.as_mut().ok_or(QuizError::NoActiveSession)?;
        if session.verdict.is_some() {
            return Err(QuizError::AlreadyAnswered);
        }
        if !session.question.options.iter().any(|o| o == choice) {
            return Err(QuizError::UnknownOption(choice.to_string()));
        }

        let verdict = if choice == session.current.definition {
            session.correct = session.correct.saturating_add(1);
            Verdict::Correct
        } else {
            session.incorrect = session.incorrect.saturating_add(1);
            if policy.reset_streak_on_incorrect {
                session.correct = 0;
            }
            Verdict::Incorrect {
                correct_answer: session.current.definition.clone(),
            }
        };
        debug!(
            question = session.question.number,
            correct = session.correct,
            verdict = ?verdict,
            "answer submitted"
        );

        if verdict.is_correct() && session.correct >= REQUIRED_CORRECT_ANSWERS {
            let grant = ExtensionGrant {
                limit_id: session.limit_id,
                minutes: EXTENSION_MINUTES,
            };
            info!(limit_id = %grant.limit_id, minutes = grant.minutes, "quiz completed");
            self.session = None;
            return Ok(Progress::Completed(grant));
        }

        session.verdict = Some(verdict.clone());
        Ok(Progress::Answered(verdict))
    }

    /// Move on after an answered question.
    pub fn next_question(&mut self) -> Result<Question, QuizError> {
        let session = self.session.as_mut().ok_or(QuizError::NoActiveSession)?;
        if session.verdict.is_none() {
            return Err(QuizError::AwaitingAnswer);
        }
        let number = session.question.number + 1;
        let (current, question) = draw(&mut *self.rng, &session.cards, &session.definitions, number)?;
        session.current = current;
        session.question = question.clone();
        session.verdict = None;
        Ok(question)
    }

    /// Abandon the session. Earned progress is discarded.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            info!(limit_id = %session.limit_id, correct = session.correct, "quiz cancelled");
        }
    }
}

fn draw(
    rng: &mut dyn RngCore,
    cards: &[Flashcard],
    definitions: &[String],
    number: u32,
) -> Result<(Flashcard, Question), QuizError> {
    let current = cards
        .choose(rng)
        .cloned()
        .ok_or(NoQuizReason::NoActiveSet)?;
    let mut options = vec![current.definition.clone()];
    let others: Vec<&String> = definitions
        .iter()
        .filter(|d| **d != current.definition)
        .collect();
    options.extend(
        others
            .choose_multiple(rng, OPTIONS_PER_QUESTION - 1)
            .map(|d| (*d).clone()),
    );
    options.shuffle(rng);

    let question = Question {
        number,
        term: current.term.clone(),
        options,
    };
    Ok((current, question))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{Flashcard, StudySet};

    fn capitals() -> Arc<dyn FlashcardProvider> {
        Arc::new(StudySet::new(
            "capitals",
            None,
            vec![
                Flashcard::new(1, "France", "Paris"),
                Flashcard::new(2, "Japan", "Tokyo"),
                Flashcard::new(3, "Peru", "Lima"),
                Flashcard::new(4, "Kenya", "Nairobi"),
                Flashcard::new(5, "Chile", "Santiago"),
            ],
        ))
    }

    fn answer_for(term: &str) -> &'static str {
        match term {
            "France" => "Paris",
            "Japan" => "Tokyo",
            "Peru" => "Lima",
            "Kenya" => "Nairobi",
            _ => "Santiago",
        }
    }

    fn wrong_option(question: &Question) -> String {
        let right = answer_for(&question.term);
        question
            .options
            .iter()
            .find(|o| o.as_str() != right)
            .cloned()
            .unwrap()
    }

    fn gate() -> ExtensionGate {
        ExtensionGate::with_seed(capitals(), QuizPolicy::default(), 7)
    }

    #[test]
    fn questions_have_four_distinct_options_including_answer() {
        let mut gate = gate();
        let q = gate.start(LimitId::new()).unwrap();
        assert_eq!(q.options.len(), OPTIONS_PER_QUESTION);
        assert_eq!(q.options.iter().collect::<BTreeSet<_>>().len(), OPTIONS_PER_QUESTION);
        assert!(q.options.iter().any(|o| o == answer_for(&q.term)));
        assert_eq!(gate.state(), GateState::Challenging);
    }

    #[test]
    fn two_correct_answers_do_not_grant() {
        let mut gate = gate();
        let mut q = gate.start(LimitId::new()).unwrap();
        for _ in 0..2 {
            let progress = gate.submit(answer_for(&q.term)).unwrap();
            assert_eq!(progress, Progress::Answered(Verdict::Correct));
            q = gate.next_question().unwrap();
        }
        assert_eq!(gate.correct_answers(), 2);
        assert_eq!(gate.state(), GateState::Challenging);
    }

    #[test]
    fn third_correct_answer_completes_with_grant() {
        let mut gate = gate();
        let limit_id = LimitId::new();
        let mut q = gate.start(limit_id).unwrap();
        gate.submit(answer_for(&q.term)).unwrap();
        q = gate.next_question().unwrap();
        gate.submit(answer_for(&q.term)).unwrap();
        q = gate.next_question().unwrap();

        let Progress::Completed(grant) = gate.submit(answer_for(&q.term)).unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(grant.limit_id(), limit_id);
        assert_eq!(grant.minutes(), 15);
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn incorrect_answer_reveals_definition_and_keeps_progress() {
        let mut gate = gate();
        let mut q = gate.start(LimitId::new()).unwrap();
        gate.submit(answer_for(&q.term)).unwrap();
        q = gate.next_question().unwrap();

        let wrong = wrong_option(&q);
        let progress = gate.submit(&wrong).unwrap();
        assert_eq!(
            progress,
            Progress::Answered(Verdict::Incorrect {
                correct_answer: answer_for(&q.term).to_string()
            })
        );
        assert_eq!(gate.state(), GateState::Incorrect);
        assert_eq!(gate.correct_answers(), 1);
        assert_eq!(gate.incorrect_answers(), 1);
    }

    #[test]
    fn strict_policy_resets_progress_on_incorrect() {
        let policy = QuizPolicy {
            reset_streak_on_incorrect: true,
        };
        let mut gate = ExtensionGate::with_seed(capitals(), policy, 3);
        let mut q = gate.start(LimitId::new()).unwrap();
        gate.submit(answer_for(&q.term)).unwrap();
        q = gate.next_question().unwrap();
        gate.submit(&wrong_option(&q)).unwrap();
        assert_eq!(gate.correct_answers(), 0);
    }

    #[test]
    fn double_submission_is_rejected() {
        let mut gate = gate();
        let q = gate.start(LimitId::new()).unwrap();
        gate.submit(&wrong_option(&q)).unwrap();
        assert_eq!(
            gate.submit(answer_for(&q.term)),
            Err(QuizError::AlreadyAnswered)
        );
        assert_eq!(gate.correct_answers(), 0);
    }

    #[test]
    fn next_question_requires_an_answer() {
        let mut gate = gate();
        gate.start(LimitId::new()).unwrap();
        assert_eq!(gate.next_question(), Err(QuizError::AwaitingAnswer));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let mut gate = gate();
        gate.start(LimitId::new()).unwrap();
        assert!(matches!(gate.submit("Atlantis"), Err(QuizError::UnknownOption(_))));
        assert_eq!(gate.state(), GateState::Challenging);
    }

    #[test]
    fn idle_gate_rejects_answers() {
        let mut gate = gate();
        assert_eq!(gate.submit("Paris"), Err(QuizError::NoActiveSession));
        assert_eq!(gate.next_question(), Err(QuizError::NoActiveSession));
    }

    #[test]
    fn cancel_discards_progress() {
        let mut gate = gate();
        let q = gate.start(LimitId::new()).unwrap();
        gate.submit(answer_for(&q.term)).unwrap();
        gate.cancel();
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.correct_answers(), 0);
        assert!(gate.current_question().is_none());
    }

    #[test]
    fn too_few_definitions_means_no_quiz() {
        let small = StudySet::new(
            "tiny",
            None,
            vec![
                Flashcard::new(1, "a", "x"),
                Flashcard::new(2, "b", "y"),
                Flashcard::new(3, "c", "y"),
            ],
        );
        let mut gate = ExtensionGate::with_seed(Arc::new(small), QuizPolicy::default(), 1);
        assert_eq!(
            gate.start(LimitId::new()),
            Err(QuizError::NoQuizAvailable(NoQuizReason::NotEnoughCards {
                name: "tiny".into(),
                distinct: 2,
                required: 4,
            }))
        );
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[test]
    fn seeded_gates_ask_the_same_questions() {
        let a = gate().start(LimitId::new()).unwrap();
        let b = gate().start(LimitId::new()).unwrap();
        assert_eq!(a, b);
    }
}
