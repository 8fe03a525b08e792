use clap::{Subcommand, ValueEnum};
use mindmunch_core::shield::{ShieldAction, ShieldedTarget, StoreRestriction};
use mindmunch_core::{AppContext, ShieldState};

use super::{print_json, CliResult};

#[derive(Clone, Copy, ValueEnum)]
pub enum Button {
    Primary,
    Secondary,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Target {
    Application,
    WebDomain,
    Category,
}

#[derive(Subcommand)]
pub enum ShieldCommand {
    /// Print the restriction currently applied
    Status,
    /// Re-derive the shield from the stored limits
    Refresh,
    /// Print the shield screen text and colours
    Appearance,
    /// Simulate a button press on the shield screen
    Action {
        #[arg(long, value_enum, default_value = "primary")]
        button: Button,
        #[arg(long, value_enum, default_value = "application")]
        target: Target,
    },
}

pub fn run(ctx: &AppContext, command: ShieldCommand) -> CliResult {
    match command {
        ShieldCommand::Status => {
            let state = StoreRestriction::load(ctx.store().as_ref()).unwrap_or_default();
            print_json(&state)?;
        }
        ShieldCommand::Refresh => {
            let mut ledger = ctx.ledger();
            let state: ShieldState = ledger.refresh_shield();
            print_json(&state)?;
        }
        ShieldCommand::Appearance => {
            let appearance = ctx.config().shield_appearance();
            let (r, g, b) = appearance.background_rgb();
            print_json(&serde_json::json!({
                "appearance": appearance,
                "background_rgb": [r, g, b],
            }))?;
        }
        ShieldCommand::Action { button, target } => {
            let action = match button {
                Button::Primary => ShieldAction::Primary,
                Button::Secondary => ShieldAction::Secondary,
            };
            let target = match target {
                Target::Application => ShieldedTarget::Application,
                Target::WebDomain => ShieldedTarget::WebDomain,
                Target::Category => ShieldedTarget::Category,
            };
            let response = ctx.handle_shield_action(action, target);
            print_json(&serde_json::json!({ "response": response }))?;
        }
    }
    Ok(())
}
