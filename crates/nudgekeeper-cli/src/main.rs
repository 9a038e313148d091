use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nudgekeeper", version, about = "Nudgekeeper CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a message for commitment intent
    Parse(commands::parse::ParseArgs),
    /// Commitment management
    Commitment {
        #[command(subcommand)]
        action: commands::commitment::CommitmentAction,
    },
    /// Nudge preference management
    Prefs {
        #[command(subcommand)]
        action: commands::prefs::PrefsAction,
    },
    /// Scheduler sweep control
    Sweep {
        #[command(subcommand)]
        action: commands::sweep::SweepAction,
    },
    /// Nudge event log
    Events {
        #[command(subcommand)]
        action: commands::events::EventsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Parse(args) => commands::parse::run(args),
        Commands::Commitment { action } => commands::commitment::run(action),
        Commands::Prefs { action } => commands::prefs::run(action),
        Commands::Sweep { action } => commands::sweep::run(action),
        Commands::Events { action } => commands::events::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
