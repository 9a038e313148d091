//! Nudge preference management (onboarding) commands.

use clap::Subcommand;
use nudgekeeper_core::commitment::NudgePreference;
use nudgekeeper_core::storage::{Config, Database};
use nudgekeeper_core::store::PreferenceStore;

use super::resolve_user;

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show stored preferences (engine defaults when none are stored)
    Show {
        #[arg(long)]
        user: Option<String>,
    },
    /// Create or update preferences
    Set {
        /// Enable/disable the do-not-disturb window
        #[arg(long)]
        dnd: Option<bool>,
        /// DND window start hour (0-23)
        #[arg(long)]
        dnd_start: Option<u8>,
        /// DND window end hour (0-23, exclusive; may wrap past midnight)
        #[arg(long)]
        dnd_end: Option<u8>,
        /// Maximum nudges delivered per day
        #[arg(long)]
        max_daily: Option<i64>,
        /// Fixed UTC offset, e.g. +08:00
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        user: Option<String>,
    },
}

pub fn run(action: PrefsAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;

    match action {
        PrefsAction::Show { user } => {
            let user = resolve_user(&config, user);
            match db.get_prefs(&user)? {
                Some(prefs) => println!("{}", serde_json::to_string_pretty(&prefs)?),
                None => {
                    let defaults = NudgePreference::defaults(&user);
                    println!("No stored preferences for {user}; engine defaults apply:");
                    println!("{}", serde_json::to_string_pretty(&defaults)?);
                }
            }
        }
        PrefsAction::Set {
            dnd,
            dnd_start,
            dnd_end,
            max_daily,
            timezone,
            user,
        } => {
            let user = resolve_user(&config, user);
            let mut prefs = db.get_prefs(&user)?.unwrap_or_else(|| {
                let mut p = NudgePreference::defaults(&user);
                p.timezone = config.timezone.clone();
                p
            });

            if let Some(enabled) = dnd {
                prefs.dnd_enabled = enabled;
            }
            if let Some(start) = dnd_start {
                if start > 23 {
                    return Err(format!("dnd-start must be 0-23, got {start}").into());
                }
                prefs.dnd_start_hour = start;
            }
            if let Some(end) = dnd_end {
                if end > 23 {
                    return Err(format!("dnd-end must be 0-23, got {end}").into());
                }
                prefs.dnd_end_hour = end;
            }
            if let Some(max) = max_daily {
                if max < 0 {
                    return Err(format!("max-daily must be non-negative, got {max}").into());
                }
                prefs.max_daily_nudges = max;
            }
            if let Some(tz) = timezone {
                prefs.timezone = tz;
            }

            db.put_prefs(&prefs)?;
            println!("Preferences saved:");
            println!("{}", serde_json::to_string_pretty(&prefs)?);
        }
    }
    Ok(())
}
