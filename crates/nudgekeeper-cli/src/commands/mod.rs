pub mod commitment;
pub mod config;
pub mod events;
pub mod parse;
pub mod prefs;
pub mod sweep;

use chrono::{DateTime, FixedOffset, Utc};
use nudgekeeper_core::storage::Config;

/// The user id a command acts as: `--user` if given, else the configured
/// default.
pub(crate) fn resolve_user(config: &Config, user: Option<String>) -> String {
    user.unwrap_or_else(|| config.default_user.clone())
}

/// The configured fallback offset, UTC when unparseable.
pub(crate) fn config_offset(config: &Config) -> FixedOffset {
    config
        .timezone
        .parse::<FixedOffset>()
        .unwrap_or_else(|_| FixedOffset::east_opt(0).unwrap())
}

/// Parse an `--at` override, defaulting to the current instant.
pub(crate) fn resolve_now(at: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match at {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}
