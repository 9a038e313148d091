//! Commitment management commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use nudgekeeper_core::commitment::{CommitmentPatch, CommitmentStatus, IntentType, NewCommitment};
use nudgekeeper_core::recurrence::Frequency;
use nudgekeeper_core::storage::{Config, Database};
use nudgekeeper_core::store::{CommitmentStore, StatusFilter};

use super::resolve_user;

#[derive(Subcommand)]
pub enum CommitmentAction {
    /// Create a new commitment directly
    Add {
        /// The action to commit to
        action: String,
        /// Title (defaults to the action)
        #[arg(long)]
        title: Option<String>,
        /// Due time, RFC3339 (omit to create a draft)
        #[arg(long)]
        when: Option<String>,
        /// Recurrence rule (FREQ=DAILY|WEEKLY|MONTHLY)
        #[arg(long)]
        rrule: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Where the commitment takes place
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Priority, higher = more important (default: 1)
        #[arg(long, default_value = "1")]
        priority: i64,
        /// Ignore do-not-disturb windows for this commitment
        #[arg(long)]
        ignore_dnd: bool,
        /// Intent kind: reminder, scheduled, recurring, meeting, task
        /// (default derived from --rrule)
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// List commitments
    List {
        /// Filter: all, draft, scheduled, completed, cancelled
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long, default_value = "50")]
        limit: usize,
        #[arg(long)]
        user: Option<String>,
    },
    /// Get commitment details
    Get {
        id: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Update a commitment
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// New due time, RFC3339
        #[arg(long)]
        when: Option<String>,
        #[arg(long)]
        priority: Option<i64>,
        /// Fail unless the stored version still matches
        #[arg(long)]
        expected_version: Option<i64>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Cancel a scheduled commitment
    Cancel {
        id: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Move a completed or cancelled commitment back to scheduled
    Reactivate {
        id: String,
        /// New due time, RFC3339 (keeps the old one when omitted)
        #[arg(long)]
        when: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete a commitment (hard delete; stops any recurrence chain)
    Delete {
        id: String,
        #[arg(long)]
        user: Option<String>,
    },
}

fn parse_when(raw: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

pub fn run(action: CommitmentAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;

    match action {
        CommitmentAction::Add {
            action,
            title,
            when,
            rrule,
            description,
            location,
            notes,
            priority,
            ignore_dnd,
            kind,
            user,
        } => {
            let user = resolve_user(&config, user);
            let when_time = when.as_deref().map(parse_when).transpose()?;
            let when_rrule = rrule
                .as_deref()
                .map(|r| r.parse::<Frequency>())
                .transpose()?;
            let intent_type = match kind {
                Some(raw) => raw.parse::<IntentType>()?,
                None if when_rrule.is_some() => IntentType::Recurring,
                None => IntentType::Scheduled,
            };
            let new = NewCommitment {
                user_id: user,
                intent_type,
                title: title.unwrap_or_else(|| action.clone()),
                what_action: action,
                description,
                where_location: location,
                notes,
                when_time,
                when_rrule,
                priority,
                dnd_respect: !ignore_dnd,
                source_message: None,
                parent_id: None,
            };
            let commitment = db.create(&new)?;
            println!("Commitment created: {}", commitment.id);
            println!("{}", serde_json::to_string_pretty(&commitment)?);
        }
        CommitmentAction::List {
            status,
            limit,
            user,
        } => {
            let user = resolve_user(&config, user);
            let filter: StatusFilter = status.parse()?;
            let commitments = db.list(&user, filter, limit)?;
            println!("{}", serde_json::to_string_pretty(&commitments)?);
        }
        CommitmentAction::Get { id, user } => {
            let user = resolve_user(&config, user);
            match db.get(&user, &id)? {
                Some(commitment) => println!("{}", serde_json::to_string_pretty(&commitment)?),
                None => println!("Commitment not found: {id}"),
            }
        }
        CommitmentAction::Update {
            id,
            title,
            action,
            description,
            location,
            notes,
            when,
            priority,
            expected_version,
            user,
        } => {
            let user = resolve_user(&config, user);
            let patch = CommitmentPatch {
                title,
                what_action: action,
                description,
                where_location: location,
                notes,
                when_time: when.as_deref().map(parse_when).transpose()?,
                status: None,
                priority,
                dnd_respect: None,
                expected_version,
            };
            let updated = db.update(&user, &id, &patch)?;
            println!("Commitment updated (version {}):", updated.version);
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        CommitmentAction::Cancel { id, user } => {
            let user = resolve_user(&config, user);
            let patch = CommitmentPatch {
                status: Some(CommitmentStatus::Cancelled),
                ..Default::default()
            };
            let updated = db.update(&user, &id, &patch)?;
            println!("Commitment cancelled: {}", updated.id);
        }
        CommitmentAction::Reactivate { id, when, user } => {
            let user = resolve_user(&config, user);
            let patch = CommitmentPatch {
                status: Some(CommitmentStatus::Scheduled),
                when_time: when.as_deref().map(parse_when).transpose()?,
                ..Default::default()
            };
            let updated = db.update(&user, &id, &patch)?;
            println!(
                "Commitment reactivated: {} (due {})",
                updated.id,
                updated
                    .when_time
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default()
            );
        }
        CommitmentAction::Delete { id, user } => {
            let user = resolve_user(&config, user);
            db.delete(&user, &id)?;
            println!("Commitment deleted: {id}");
        }
    }
    Ok(())
}
