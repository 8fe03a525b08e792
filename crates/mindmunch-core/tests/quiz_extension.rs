//! Integration tests for the quiz gate over the stored study-set library.

use std::sync::Arc;

use mindmunch_core::quiz::parse_flashcards_tsv;
use mindmunch_core::{
    AppContext, Config, ExtensionGate, GateState, LimitId, MemoryStore, NoQuizReason, Progress,
    QuizError, QuizPolicy, Selection, StudySet, StudySetLibrary, Verdict,
};

const DECK: &str = "\
# term\tdefinition
mitochondria\tpowerhouse of the cell
ribosome\tmakes proteins
nucleus\tholds the DNA
membrane\tcontrols what enters the cell
";

fn library() -> Arc<StudySetLibrary> {
    let lib = StudySetLibrary::new(Arc::new(MemoryStore::new()), 3);
    let cards = parse_flashcards_tsv(DECK).unwrap();
    lib.add(StudySet::new("biology", Some("biology.tsv".into()), cards))
        .unwrap();
    lib.set_active("biology").unwrap();
    Arc::new(lib)
}

fn answer(lib: &StudySetLibrary, term: &str) -> String {
    lib.get("biology")
        .unwrap()
        .flashcards
        .into_iter()
        .find(|c| c.term == term)
        .unwrap()
        .definition
}

#[test]
fn test_no_active_set_means_no_quiz() {
    let lib = StudySetLibrary::new(Arc::new(MemoryStore::new()), 3);
    let mut gate = ExtensionGate::new(Arc::new(lib), QuizPolicy::default());
    assert_eq!(
        gate.start(LimitId::new()),
        Err(QuizError::NoQuizAvailable(NoQuizReason::NoActiveSet))
    );
}

#[test]
fn test_two_correct_answers_are_not_enough() {
    let lib = library();
    let mut gate = ExtensionGate::with_seed(lib.clone(), QuizPolicy::default(), 11);
    let mut q = gate.start(LimitId::new()).unwrap();

    for _ in 0..2 {
        let progress = gate.submit(&answer(&lib, &q.term)).unwrap();
        assert_eq!(progress, Progress::Answered(Verdict::Correct));
        q = gate.next_question().unwrap();
    }
    assert_eq!(gate.state(), GateState::Challenging);
    gate.cancel();
    assert_eq!(gate.state(), GateState::Idle);
}

#[test]
fn test_wrong_answers_do_not_block_completion() {
    let lib = library();
    let limit_id = LimitId::new();
    let mut gate = ExtensionGate::with_seed(lib.clone(), QuizPolicy::default(), 5);
    let mut q = gate.start(limit_id).unwrap();

    let mut submitted = 0;
    let grant = loop {
        submitted += 1;
        let right = answer(&lib, &q.term);
        let choice = if submitted % 2 == 0 {
            q.options.iter().find(|o| **o != right).cloned().unwrap()
        } else {
            right
        };
        match gate.submit(&choice).unwrap() {
            Progress::Completed(grant) => break grant,
            Progress::Answered(_) => q = gate.next_question().unwrap(),
        }
    };

    assert_eq!(submitted, 5);
    assert_eq!(grant.limit_id(), limit_id);
    assert_eq!(grant.minutes(), 15);
}

#[test]
fn test_edited_config_cannot_shorten_the_quiz() {
    let config: Config =
        toml::from_str("[quiz]\nrequired_correct = 1\nextension_minutes = 600\n").unwrap();
    config.validate().unwrap();
    let ctx = AppContext::new(config, Arc::new(MemoryStore::new()));

    let lib = ctx.library();
    lib.add(StudySet::new("biology", None, parse_flashcards_tsv(DECK).unwrap()))
        .unwrap();
    lib.set_active("biology").unwrap();

    let mut ledger = ctx.ledger();
    let limit = ledger
        .add_limit(Selection::new().with_application("app.a"), 0, 0)
        .unwrap();

    let mut gate = ctx.gate();
    let mut q = gate.start(limit.id()).unwrap();
    for _ in 0..2 {
        let progress = gate.submit(&answer(&lib, &q.term)).unwrap();
        assert_eq!(progress, Progress::Answered(Verdict::Correct));
        q = gate.next_question().unwrap();
    }
    let Progress::Completed(grant) = gate.submit(&answer(&lib, &q.term)).unwrap() else {
        panic!("third correct answer should complete");
    };
    assert_eq!(grant.minutes(), 15);
    let extended = ledger.extend_limit(grant).unwrap();
    assert_eq!(extended.remaining_secs(), 900);
}
