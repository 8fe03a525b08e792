pub mod config;
pub mod engine;
pub mod limit;
pub mod monitor;
pub mod quiz;
pub mod report;
pub mod shield;
pub mod study_set;

use mindmunch_core::LimitId;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn parse_limit_id(raw: &str) -> Result<LimitId, Box<dyn std::error::Error>> {
    raw.parse::<LimitId>()
        .map_err(|e| format!("invalid limit id '{raw}': {e}").into())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
