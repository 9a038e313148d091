//! Parse a free-text message for commitment intent.

use clap::Args;
use nudgekeeper_core::intent;
use nudgekeeper_core::storage::{Config, Database};
use nudgekeeper_core::store::CommitmentStore;

use super::{config_offset, resolve_now, resolve_user};

#[derive(Args)]
pub struct ParseArgs {
    /// The message to parse
    pub message: String,
    /// User to act as (default from config)
    #[arg(long)]
    pub user: Option<String>,
    /// Persist the draft as a commitment after parsing
    #[arg(long)]
    pub create: bool,
    /// Evaluate "now" at this RFC3339 instant instead of the wall clock
    #[arg(long)]
    pub at: Option<String>,
}

pub fn run(args: ParseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let user = resolve_user(&config, args.user);
    // Relative dates resolve in the configured local frame.
    let now = resolve_now(args.at.as_deref())?.with_timezone(&config_offset(&config));

    match intent::extract(&args.message, now) {
        None => println!("No commitment detected."),
        Some(draft) => {
            println!("{}", serde_json::to_string_pretty(&draft)?);
            if draft.needs_clarification {
                println!("Needs clarification before it can be scheduled.");
            }
            if args.create {
                let db = Database::open()?;
                let commitment = db.create(&draft.into_new(&user))?;
                println!(
                    "Commitment created: {} (status: {})",
                    commitment.id, commitment.status
                );
            }
        }
    }
    Ok(())
}
