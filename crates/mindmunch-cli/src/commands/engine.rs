use std::sync::Arc;
use std::time::Duration;

use mindmunch_core::{AppContext, Event, TickDriver};
use tokio::sync::Mutex;
use tracing::{error, info};

use super::{print_json, CliResult};

pub fn tick(ctx: &AppContext) -> CliResult {
    let mut ledger = ctx.ledger();
    let report = ledger.tick_now();
    print_json(&report)
}

/// Run the foreground driver, printing every ledger event as one JSON line.
pub fn watch(ctx: &AppContext, interval_ms: Option<u64>) -> CliResult {
    let period = match interval_ms {
        Some(0) => return Err("--interval-ms must be greater than zero".into()),
        Some(ms) => Duration::from_millis(ms),
        None => ctx.tick_interval(),
    };

    let mut ledger = ctx.ledger();
    ledger.subscribe(Arc::new(|event: &Event| {
        if !matches!(event, Event::Ticked { decremented: 0, .. }) {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        }
    }));
    ledger.refresh_shield();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let driver = TickDriver::spawn(Arc::new(Mutex::new(ledger)), period);
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to wait for Ctrl-C");
        }
        info!("shutting down");
        driver.stop().await;
    });
    Ok(())
}
