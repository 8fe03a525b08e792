use clap::Subcommand;
use mindmunch_core::monitor::StoreScheduler;
use mindmunch_core::{ActivityName, AppContext, EventName};
use tokio_util::sync::CancellationToken;

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum MonitorAction {
    /// List registered activities
    List,
    /// Register every stored limit with the activity monitor
    Sync,
    /// Deliver a threshold-reached callback
    Threshold {
        /// Activity name (the limit ID)
        activity: String,
        /// Event name (defaults to "<activity>.threshold")
        #[arg(long)]
        event: Option<String>,
    },
    /// Deliver an interval-start callback
    IntervalStart {
        activity: String,
    },
    /// Deliver an interval-end callback
    IntervalEnd {
        activity: String,
    },
    /// Run one background refresh wake
    Wake,
}

pub fn run(ctx: &AppContext, action: MonitorAction) -> CliResult {
    match action {
        MonitorAction::List => {
            print_json(&StoreScheduler::load(ctx.store().as_ref()))?;
        }
        MonitorAction::Sync => {
            let registrar = ctx.registrar()?;
            let ledger = ctx.ledger();
            let failed = registrar.register_all(ledger.limits());
            print_json(&serde_json::json!({
                "registered": ledger.len() - failed,
                "failed": failed,
            }))?;
        }
        MonitorAction::Threshold { activity, event } => {
            let activity = ActivityName::new(activity);
            let event = match event {
                Some(name) => EventName::new(name),
                None => EventName::new(format!("{activity}.threshold")),
            };
            let outcome = ctx.bridge().on_threshold_reached(&event, &activity);
            print_json(&outcome)?;
        }
        MonitorAction::IntervalStart { activity } => {
            let report = ctx.bridge().on_interval_start(&ActivityName::new(activity));
            print_json(&report)?;
        }
        MonitorAction::IntervalEnd { activity } => {
            let report = ctx.bridge().on_interval_end(&ActivityName::new(activity));
            print_json(&report)?;
        }
        MonitorAction::Wake => {
            let outcome = ctx.background().handle_wake(&CancellationToken::new());
            print_json(&outcome)?;
        }
    }
    Ok(())
}
