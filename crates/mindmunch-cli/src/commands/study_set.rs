use std::path::PathBuf;

use clap::Subcommand;
use mindmunch_core::quiz::parse_flashcards_tsv;
use mindmunch_core::{AppContext, StudySet};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum StudySetAction {
    /// Import a set from a "term<TAB>definition" file
    Import {
        /// Set name
        name: String,
        /// TSV file
        file: PathBuf,
        /// Make it the active set
        #[arg(long)]
        activate: bool,
    },
    /// List saved sets
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Choose the set quizzes draw from
    Use {
        name: String,
    },
    /// Print a set as JSON
    Show {
        name: String,
    },
    /// Delete a set
    Delete {
        name: String,
    },
}

pub fn run(ctx: &AppContext, action: StudySetAction) -> CliResult {
    let library = ctx.library();

    match action {
        StudySetAction::Import {
            name,
            file,
            activate,
        } => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
            let cards = parse_flashcards_tsv(&text)?;
            let count = cards.len();
            library.add(StudySet::new(
                name.clone(),
                Some(file.display().to_string()),
                cards,
            ))?;
            if activate {
                library.set_active(&name)?;
            }
            println!("Imported {count} cards into '{name}'.");
        }
        StudySetAction::List { json } => {
            let sets = library.list();
            let active = library.active_name();
            if json {
                let rows: Vec<_> = sets
                    .iter()
                    .map(|s| {
                        serde_json::json!({
                            "name": s.name,
                            "cards": s.flashcards.len(),
                            "active": active.as_deref() == Some(s.name.as_str()),
                        })
                    })
                    .collect();
                print_json(&rows)?;
            } else if sets.is_empty() {
                println!("No study sets. Import one with `study-set import`.");
            } else {
                for set in &sets {
                    let marker = if active.as_deref() == Some(set.name.as_str()) { "*" } else { " " };
                    println!("{marker} {} ({} cards)", set.name, set.flashcards.len());
                }
                println!("{}/{} sets saved", sets.len(), library.max_sets());
            }
        }
        StudySetAction::Use { name } => {
            library.set_active(&name)?;
            println!("Active study set: {name}");
        }
        StudySetAction::Show { name } => {
            let set = library
                .get(&name)
                .ok_or_else(|| format!("no study set named '{name}'"))?;
            print_json(&set)?;
        }
        StudySetAction::Delete { name } => {
            library.delete(&name)?;
            println!("Deleted study set '{name}'.");
        }
    }
    Ok(())
}
