use clap::Subcommand;
use mindmunch_core::report::format_remaining;
use mindmunch_core::{AppContext, Selection};

use super::{parse_limit_id, print_json, CliResult};

#[derive(Subcommand)]
pub enum LimitAction {
    /// Add a daily limit
    Add {
        /// Application token to limit (repeatable)
        #[arg(long = "app")]
        apps: Vec<String>,
        /// Category token to limit (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Web domain to limit (repeatable)
        #[arg(long = "domain")]
        domains: Vec<String>,
        /// Budget hours (0-23)
        #[arg(long, default_value = "0")]
        hours: u32,
        /// Budget minutes (0-59)
        #[arg(long, default_value = "0")]
        minutes: u32,
    },
    /// List limits with their remaining budget
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one limit as JSON
    Show {
        /// Limit ID
        id: String,
    },
    /// Delete a limit
    Delete {
        /// Limit ID
        id: String,
    },
}

pub fn run(ctx: &AppContext, action: LimitAction) -> CliResult {
    let mut ledger = ctx.ledger();

    match action {
        LimitAction::Add {
            apps,
            categories,
            domains,
            hours,
            minutes,
        } => {
            let mut selection = Selection::new();
            for app in apps {
                selection = selection.with_application(app);
            }
            for category in categories {
                selection = selection.with_category(category);
            }
            for domain in domains {
                selection = selection.with_web_domain(domain);
            }
            if selection.is_empty() {
                return Err("select at least one --app, --category or --domain".into());
            }
            let limit = ctx.add_limit(&mut ledger, selection, hours, minutes)?;
            print_json(&limit)?;
        }
        LimitAction::List { json } => {
            // Bring the budgets up to date before showing them.
            ledger.tick_now();
            if json {
                print_json(&ledger.limits())?;
            } else if ledger.is_empty() {
                println!("No limits.");
            } else {
                for limit in ledger.limits() {
                    let status = if limit.is_locked() { "LOCKED" } else { "active" };
                    println!(
                        "{}  {:>7}  remaining {:>12}  {:<6}  {}",
                        limit.id(),
                        limit.configured().to_string(),
                        format_remaining(limit.remaining_secs()),
                        status,
                        limit.selection()
                    );
                }
            }
        }
        LimitAction::Show { id } => {
            let id = parse_limit_id(&id)?;
            ledger.tick_now();
            let limit = ledger.get(id).ok_or_else(|| format!("limit not found: {id}"))?;
            print_json(limit)?;
        }
        LimitAction::Delete { id } => {
            let id = parse_limit_id(&id)?;
            ctx.delete_limit(&mut ledger, id)?;
            println!("{{\"type\": \"limit_deleted\", \"id\": \"{id}\"}}");
        }
    }
    Ok(())
}
