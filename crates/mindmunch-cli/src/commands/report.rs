use std::path::PathBuf;

use clap::Args;
use mindmunch_core::report::{format_usage, ActivitySegment};
use mindmunch_core::UsageReport;

use super::{print_json, CliResult};

#[derive(Args)]
pub struct ReportArgs {
    /// JSON file holding an array of activity segments
    #[arg(long)]
    file: PathBuf,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: ReportArgs) -> CliResult {
    let text = std::fs::read_to_string(&args.file)
        .map_err(|e| format!("cannot read {}: {e}", args.file.display()))?;
    let segments: Vec<ActivitySegment> = serde_json::from_str(&text)?;
    let report = UsageReport::from_segments(&segments);

    if args.json {
        return print_json(&report);
    }

    println!("Total screen time: {}", format_usage(report.total_secs));
    if report.apps.is_empty() {
        println!("No app activity.");
    }
    for app in &report.apps {
        println!("  {:<32} {:>12}", app.name, format_usage(app.duration_secs));
    }
    Ok(())
}
