use clap::{Parser, Subcommand};
use mindmunch_core::{AppContext, Config};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "mindmunch-cli", version, about = "MindMunch CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily limit management
    Limit {
        #[command(subcommand)]
        action: commands::limit::LimitAction,
    },
    /// Run one decrement pass
    Tick,
    /// Keep decrementing in the foreground until Ctrl-C
    Watch {
        /// Pass period in milliseconds (defaults to engine.tick_interval_ms)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Quiz to earn more time
    Quiz {
        #[command(subcommand)]
        action: commands::quiz::QuizAction,
    },
    /// Flashcard study sets
    StudySet {
        #[command(subcommand)]
        action: commands::study_set::StudySetAction,
    },
    /// Activity monitor callbacks and registrations
    Monitor {
        #[command(subcommand)]
        action: commands::monitor::MonitorAction,
    },
    /// Shield state and actions
    Shield {
        #[command(subcommand)]
        action: commands::shield::ShieldCommand,
    },
    /// Summarize activity segments
    Report(commands::report::ReportArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing(config: &Config) {
    // RUST_LOG wins over the configured filter.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_context() -> Result<AppContext, Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config);
    Ok(AppContext::open(config)?)
}

fn run(cli: Cli) -> commands::CliResult {
    match cli.command {
        Commands::Limit { action } => commands::limit::run(&open_context()?, action),
        Commands::Tick => commands::engine::tick(&open_context()?),
        Commands::Watch { interval_ms } => commands::engine::watch(&open_context()?, interval_ms),
        Commands::Quiz { action } => commands::quiz::run(&open_context()?, action),
        Commands::StudySet { action } => commands::study_set::run(&open_context()?, action),
        Commands::Monitor { action } => commands::monitor::run(&open_context()?, action),
        Commands::Shield { action } => commands::shield::run(&open_context()?, action),
        Commands::Report(args) => commands::report::run(args),
        Commands::Config { action } => commands::config::run(action),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
