//! Configuration management commands.

use clap::Subcommand;
use nudgekeeper_core::storage::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Update configuration values
    Set {
        /// Default user id the CLI acts as
        #[arg(long)]
        default_user: Option<String>,
        /// Fallback fixed UTC offset, e.g. +08:00
        #[arg(long)]
        timezone: Option<String>,
        /// Max commitments examined per sweep
        #[arg(long)]
        batch_size: Option<usize>,
        /// Watch-mode sweep cadence in seconds
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Set {
            default_user,
            timezone,
            batch_size,
            interval_secs,
        } => {
            let mut config = Config::load()?;
            if let Some(user) = default_user {
                config.default_user = user;
            }
            if let Some(tz) = timezone {
                config.timezone = tz;
            }
            if let Some(batch) = batch_size {
                config.sweep.batch_size = batch;
            }
            if let Some(secs) = interval_secs {
                config.sweep.interval_secs = secs;
            }
            config.save()?;
            println!("Configuration saved:");
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
