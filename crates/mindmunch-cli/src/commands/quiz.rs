use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Subcommand;
use mindmunch_core::quiz::REQUIRED_CORRECT_ANSWERS;
use mindmunch_core::report::format_remaining;
use mindmunch_core::{AppContext, ExtensionGate, Progress, Question, Verdict};

use super::{parse_limit_id, CliResult};

#[derive(Subcommand)]
pub enum QuizAction {
    /// Answer flashcard questions to add time to a locked limit
    Start {
        /// Limit ID
        id: String,
        /// Seed for a reproducible question order
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn print_question(question: &Question) {
    println!();
    println!("Question {}: {}", question.number, question.term);
    for (i, option) in question.options.iter().enumerate() {
        println!("  {}) {}", i + 1, option);
    }
    print!("Answer (1-{}, q to quit): ", question.options.len());
    let _ = io::stdout().flush();
}

pub fn run(ctx: &AppContext, action: QuizAction) -> CliResult {
    match action {
        QuizAction::Start { id, seed } => {
            let id = parse_limit_id(&id)?;
            let mut ledger = ctx.ledger();
            ledger.tick_now();
            let limit = ledger.get(id).ok_or_else(|| format!("limit not found: {id}"))?;
            if !limit.is_locked() {
                return Err(format!(
                    "limit {id} still has {} left; quizzes only unlock locked limits",
                    format_remaining(limit.remaining_secs())
                )
                .into());
            }

            let mut gate = match seed {
                Some(seed) => {
                    ExtensionGate::with_seed(Arc::new(ctx.library()), ctx.config().quiz_policy(), seed)
                }
                None => ctx.gate(),
            };
            let mut question = gate.start(id)?;
            print_question(&question);

            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = line?;
                let input = line.trim();
                if input.eq_ignore_ascii_case("q") {
                    gate.cancel();
                    println!("Quiz cancelled.");
                    return Ok(());
                }
                let choice = match input.parse::<usize>() {
                    Ok(n) if (1..=question.options.len()).contains(&n) => question.options[n - 1].clone(),
                    _ => {
                        print!("Pick a number between 1 and {}: ", question.options.len());
                        let _ = io::stdout().flush();
                        continue;
                    }
                };

                match gate.submit(&choice)? {
                    Progress::Completed(grant) => {
                        let limit = ledger.extend_limit(grant)?;
                        println!("Correct! Limit unlocked.");
                        println!("Remaining: {}", format_remaining(limit.remaining_secs()));
                        return Ok(());
                    }
                    Progress::Answered(Verdict::Correct) => {
                        println!("Correct! ({}/{REQUIRED_CORRECT_ANSWERS})", gate.correct_answers());
                    }
                    Progress::Answered(Verdict::Incorrect { correct_answer }) => {
                        println!("Incorrect! The correct answer was: {correct_answer}");
                    }
                }
                question = gate.next_question()?;
                print_question(&question);
            }

            gate.cancel();
            println!();
            println!("Quiz ended without an extension.");
        }
    }
    Ok(())
}
