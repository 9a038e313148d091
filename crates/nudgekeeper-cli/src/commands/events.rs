//! Nudge event log inspection.

use clap::Subcommand;
use nudgekeeper_core::storage::{Config, Database};
use nudgekeeper_core::store::NudgeLog;

use super::resolve_user;

#[derive(Subcommand)]
pub enum EventsAction {
    /// List recent nudge events, newest first
    List {
        #[arg(long, default_value = "50")]
        limit: usize,
        #[arg(long)]
        user: Option<String>,
    },
}

pub fn run(action: EventsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;

    match action {
        EventsAction::List { limit, user } => {
            let user = resolve_user(&config, user);
            let events = db.list_events(&user, limit)?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
    }
    Ok(())
}
